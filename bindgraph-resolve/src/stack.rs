//! The binding stack threaded through resolution
//!
//! Each entry records one edge of the traversal: a requested key and the
//! declaration that requested it. The stack detects when a key is requested
//! while it is still being resolved and renders the chain of edges for
//! diagnostics.

use bindgraph_core::{ClassId, ContextualTypeKey, TypeKey};
use std::fmt::Write;

/// One request edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingStackEntry {
    pub contextual_key: ContextualTypeKey,
    /// The declaration that asked for the key
    pub usage: String,
}

impl BindingStackEntry {
    pub fn new(contextual_key: ContextualTypeKey, usage: impl Into<String>) -> Self {
        Self {
            contextual_key,
            usage: usage.into(),
        }
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.contextual_key.type_key
    }

    pub fn is_deferrable(&self) -> bool {
        self.contextual_key.is_deferrable()
    }
}

#[derive(Debug, Clone)]
pub struct BindingStack {
    graph: ClassId,
    entries: Vec<BindingStackEntry>,
}

impl BindingStack {
    pub fn new(graph: ClassId) -> Self {
        Self {
            graph,
            entries: Vec::new(),
        }
    }

    pub fn graph(&self) -> &ClassId {
        &self.graph
    }

    pub fn push(&mut self, entry: BindingStackEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<BindingStackEntry> {
        self.entries.pop()
    }

    pub fn top(&self) -> Option<&BindingStackEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[BindingStackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the earliest entry for `key`, ignoring the top entry
    pub fn earlier_entry_for(&self, key: &TypeKey) -> Option<usize> {
        let below_top = self.entries.len().saturating_sub(1);
        self.entries[..below_top]
            .iter()
            .position(|entry| entry.type_key() == key)
    }

    /// The edges of the cycle closed by the top entry, if it closes one
    ///
    /// The first returned entry is the original request for the repeated key;
    /// the rest are the edges that lead back to it.
    pub fn cycle_for_top(&self) -> Option<&[BindingStackEntry]> {
        let top = self.top()?;
        let start = self.earlier_entry_for(top.type_key())?;
        Some(&self.entries[start..])
    }

    fn render_edge(&self, out: &mut String, entry: &BindingStackEntry) {
        let _ = writeln!(out, "{} is injected at", entry.contextual_key.render(true, true));
        let _ = writeln!(out, "    [{}] {}", self.graph.short_name(), entry.usage);
    }

    /// Render the whole stack, most recent request first
    pub fn render_trace(&self) -> String {
        let mut out = String::new();
        for entry in self.entries.iter().rev() {
            self.render_edge(&mut out, entry);
        }
        out.trim_end().to_string()
    }

    /// Render the cycle closed by the top entry
    ///
    /// Returns the `A --> B --> A` chain and the trace of edges back to the
    /// repeated key, ending in an ellipsis.
    pub fn render_cycle(&self) -> Option<(String, String)> {
        let cycle = self.cycle_for_top()?;
        let chain = cycle
            .iter()
            .map(|entry| entry.contextual_key.type_key.render(true, true))
            .collect::<Vec<_>>()
            .join(" --> ");

        let mut trace = String::new();
        for entry in cycle[1..].iter().rev() {
            self.render_edge(&mut trace, entry);
        }
        let _ = writeln!(
            trace,
            "{} is injected at",
            cycle[0].contextual_key.render(true, true)
        );
        trace.push_str("    ...");
        Some((chain, trace))
    }
}
