//! Storage planning
//!
//! Once a graph is resolved, every binding is assigned a representation:
//! a stored field computed once per graph instance, a getter that wraps its
//! construction, or nothing at all so it is inlined at its single use.

use crate::error::{ResolveError, Result};
use crate::graph::ResolvedGraph;
use bindgraph_core::{Binding, ContextualTypeKey, TypeKey};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How a binding is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    Field,
    Getter,
    Inline,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Field => write!(f, "field"),
            StorageKind::Getter => write!(f, "getter"),
            StorageKind::Inline => write!(f, "inline"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannedStorage {
    pub binding: Arc<Binding>,
    pub kind: StorageKind,
}

/// Storage decisions for one graph, ordered by key
#[derive(Debug, Clone, Default)]
pub struct StoragePlan {
    entries: BTreeMap<TypeKey, PlannedStorage>,
}

impl StoragePlan {
    pub fn get(&self, key: &TypeKey) -> Option<&PlannedStorage> {
        self.entries.get(key)
    }

    pub fn kind_of(&self, key: &TypeKey) -> Option<StorageKind> {
        self.entries.get(key).map(|p| p.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeKey, &PlannedStorage)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys stored as fields
    pub fn fields(&self) -> impl Iterator<Item = &TypeKey> {
        self.keys_of(StorageKind::Field)
    }

    /// Keys exposed through getters
    pub fn getters(&self) -> impl Iterator<Item = &TypeKey> {
        self.keys_of(StorageKind::Getter)
    }

    fn keys_of(&self, kind: StorageKind) -> impl Iterator<Item = &TypeKey> {
        self.entries
            .iter()
            .filter(move |(_, p)| p.kind == kind)
            .map(|(key, _)| key)
    }
}

pub struct StoragePlanner<'a> {
    graph: &'a ResolvedGraph,
    ref_counts: FxHashMap<TypeKey, usize>,
    /// Alias keys resolved to their final non-alias target
    alias_targets: FxHashMap<TypeKey, TypeKey>,
}

impl<'a> StoragePlanner<'a> {
    pub fn new(graph: &'a ResolvedGraph) -> Self {
        Self {
            graph,
            ref_counts: FxHashMap::default(),
            alias_targets: FxHashMap::default(),
        }
    }

    pub fn plan(mut self) -> Result<StoragePlan> {
        let graph = self.graph;
        let mut aliased_into_multibinding = FxHashSet::default();

        for binding in graph.bindings().values() {
            match binding.as_ref() {
                // The alias target is counted when something uses the alias
                Binding::Alias(alias) => {
                    if binding.is_into_multibinding() {
                        if let Some(target) = self.resolve_alias(&alias.aliased_type)? {
                            let non_trivial = graph
                                .find_binding(&target)
                                .map_or(false, |t| !t.has_trivial_dependencies());
                            if non_trivial {
                                aliased_into_multibinding.insert(target);
                            }
                        }
                    }
                }
                _ => {
                    for dependency in binding.dependencies() {
                        self.mark(&dependency)?;
                    }
                }
            }
        }

        let mut entries = BTreeMap::new();
        for (key, binding) in graph.bindings() {
            let kind = match graph.reserved_property(key) {
                Some(reserved) if reserved.has_getter => Some(StorageKind::Getter),
                Some(reserved) if reserved.has_field => Some(StorageKind::Field),
                Some(reserved) => {
                    return Err(ResolveError::compiler_bug(format!(
                        "Reserved property {} for {} has neither a getter nor a field",
                        reserved.name, key
                    )))
                }
                None => self.decide(key, binding, &aliased_into_multibinding),
            };
            if let Some(kind) = kind {
                entries.insert(
                    key.clone(),
                    PlannedStorage {
                        binding: Arc::clone(binding),
                        kind,
                    },
                );
            }
        }

        let plan = StoragePlan { entries };
        debug!(
            "Planned storage for {}: {} field(s), {} getter(s), {} entries",
            graph.id(),
            plan.fields().count(),
            plan.getters().count(),
            plan.len()
        );
        Ok(plan)
    }

    /// Storage for an unreserved binding; `None` leaves it to the consumer
    fn decide(
        &self,
        key: &TypeKey,
        binding: &Binding,
        aliased_into_multibinding: &FxHashSet<TypeKey>,
    ) -> Option<StorageKind> {
        if binding.is_scoped() {
            return Some(StorageKind::Field);
        }
        match binding {
            Binding::GraphDependency(_) | Binding::Assisted(_) => {
                return Some(StorageKind::Field)
            }
            Binding::ConstructorInjected(b) if b.is_assisted() => return Some(StorageKind::Field),
            Binding::Multibinding(_) => return None,
            _ => {}
        }

        let ref_count = self.ref_counts.get(key).copied().unwrap_or(0);
        if ref_count >= 2 {
            Some(StorageKind::Field)
        } else if binding.is_into_multibinding() && !binding.has_trivial_dependencies() {
            Some(StorageKind::Getter)
        } else if aliased_into_multibinding.contains(key) {
            Some(StorageKind::Getter)
        } else {
            Some(StorageKind::Inline)
        }
    }

    /// Count a use of `dependency`, crediting the end of any alias chain
    fn mark(&mut self, dependency: &ContextualTypeKey) -> Result<()> {
        let graph = self.graph;
        let binding = match graph.find_binding(&dependency.type_key) {
            Some(binding) => binding,
            None if dependency.has_default => return Ok(()),
            None => {
                graph.require_binding(dependency)?;
                return Ok(());
            }
        };

        let counted = match binding.as_ref() {
            Binding::Alias(alias) if alias.contextual_type_key.type_key != alias.aliased_type => {
                match self.resolve_alias(&alias.aliased_type)? {
                    Some(target) => target,
                    None => return Ok(()),
                }
            }
            _ => dependency.type_key.clone(),
        };
        *self.ref_counts.entry(counted).or_insert(0) += 1;
        Ok(())
    }

    /// Follow an alias chain to its first non-alias binding
    fn resolve_alias(&mut self, start: &TypeKey) -> Result<Option<TypeKey>> {
        if let Some(target) = self.alias_targets.get(start) {
            return Ok(Some(target.clone()));
        }

        let mut chain = vec![start.clone()];
        let mut seen = FxHashSet::default();
        seen.insert(start.clone());
        let mut current = start.clone();
        let target = loop {
            if let Some(cached) = self.alias_targets.get(&current) {
                break cached.clone();
            }
            let Some(binding) = self.graph.find_binding(&current) else {
                return Ok(None);
            };
            match binding.as_ref() {
                Binding::Alias(alias) if alias.aliased_type != current => {
                    let next = alias.aliased_type.clone();
                    chain.push(next.clone());
                    if !seen.insert(next.clone()) {
                        return Err(ResolveError::AliasCycle {
                            chain: chain
                                .iter()
                                .map(|k| k.render(true, true))
                                .collect::<Vec<_>>()
                                .join(" --> "),
                        });
                    }
                    current = next;
                }
                _ => break current,
            }
        };

        for key in chain {
            self.alias_targets.insert(key, target.clone());
        }
        Ok(Some(target))
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
