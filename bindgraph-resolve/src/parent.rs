//! Ancestor graphs as seen from a graph extension
//!
//! A [`ParentContext`] is the stack of already-resolved ancestors of the graph
//! being resolved. The child asks whether a key or scope is available above
//! it and, when it decides to read a value from an ancestor, marks the key so
//! that ancestor is later forced to expose it.

use crate::graph::ResolvedGraph;
use bindgraph_core::{AccessKind, Annotation, Binding, ClassId, PropertyAccess, TypeKey};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// One resolved ancestor graph
///
/// Levels are shared between sibling extensions, so the demand record sits
/// behind a lock.
#[derive(Debug)]
pub struct ParentLevel {
    graph: ClassId,
    graph_key: TypeKey,
    scopes: BTreeSet<Annotation>,
    available_keys: FxHashSet<TypeKey>,
    bound_instances: Vec<TypeKey>,
    demands: Mutex<BTreeMap<TypeKey, PropertyAccess>>,
}

impl ParentLevel {
    pub fn new(graph: ClassId, scopes: impl IntoIterator<Item = Annotation>) -> Self {
        Self {
            graph_key: TypeKey::simple(graph.clone()),
            graph,
            scopes: scopes.into_iter().collect(),
            available_keys: FxHashSet::default(),
            bound_instances: Vec::new(),
            demands: Mutex::new(BTreeMap::new()),
        }
    }

    /// Keys the ancestor resolved
    pub fn with_available_keys(mut self, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        self.available_keys.extend(keys);
        self
    }

    /// Instances bound on the ancestor that children may inherit
    pub fn with_bound_instances(mut self, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        self.bound_instances.extend(keys);
        self
    }

    /// Build a level from an ancestor's finished resolution
    pub fn from_resolved(graph: &ResolvedGraph) -> Self {
        let bound_instances = graph
            .bindings()
            .values()
            .filter_map(|binding| match binding.as_ref() {
                Binding::BoundInstance(b) if !b.is_graph_itself => Some(b.type_key.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        let mut level = Self::new(graph.id().clone(), graph.scopes().iter().cloned())
            .with_available_keys(graph.bindings().keys().cloned())
            .with_bound_instances(bound_instances);
        level.graph_key = graph.type_key().clone();
        level
    }

    pub fn graph(&self) -> &ClassId {
        &self.graph
    }

    pub fn graph_key(&self) -> &TypeKey {
        &self.graph_key
    }

    pub fn scopes(&self) -> &BTreeSet<Annotation> {
        &self.scopes
    }

    pub fn bound_instances(&self) -> &[TypeKey] {
        &self.bound_instances
    }

    /// Whether this level resolved or was already asked to expose `key`
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.available_keys.contains(key) || self.demands.lock().contains_key(key)
    }

    pub fn contains_scope(&self, scope: &Annotation) -> bool {
        self.scopes.contains(scope)
    }

    /// Demand that this level exposes `key`
    ///
    /// Marking the same key again returns the access created the first time.
    pub fn mark(&self, key: &TypeKey) -> PropertyAccess {
        let mut demands = self.demands.lock();
        if let Some(existing) = demands.get(key) {
            return existing.clone();
        }
        let base = format!("{}Provider", property_hint(key));
        let mut property_name = base.clone();
        let mut suffix = 2;
        while demands.values().any(|a| a.property_name == property_name) {
            property_name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        let access = PropertyAccess {
            owner_key: self.graph_key.clone(),
            property_name,
            kind: AccessKind::Field,
        };
        debug!("{} must expose {} as {}", self.graph, key, access.property_name);
        demands.insert(key.clone(), access.clone());
        access
    }

    /// Keys children have demanded from this level
    pub fn demanded_keys(&self) -> BTreeSet<TypeKey> {
        self.demands.lock().keys().cloned().collect()
    }
}

fn property_hint(key: &TypeKey) -> String {
    let rendered = key.ty.render(true);
    let mut hint: String = rendered.chars().filter(|c| c.is_alphanumeric()).collect();
    if let Some(first) = hint.get(..1) {
        let lower = first.to_lowercase();
        hint.replace_range(..1, &lower);
    }
    if key.qualifier.is_some() {
        hint.push_str("Qualified");
    }
    hint
}

/// The ancestors of a graph extension, outermost first
#[derive(Debug, Clone, Default)]
pub struct ParentContext {
    levels: Vec<Arc<ParentLevel>>,
}

impl ParentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a level below the existing ones
    pub fn push(&mut self, level: Arc<ParentLevel>) {
        self.levels.push(level);
    }

    pub fn with_level(mut self, level: Arc<ParentLevel>) -> Self {
        self.push(level);
        self
    }

    pub fn levels(&self) -> &[Arc<ParentLevel>] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Whether some ancestor already satisfies `key`
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.levels.iter().any(|level| level.contains(key))
    }

    /// Whether some ancestor declares `scope`
    pub fn contains_scope(&self, scope: &Annotation) -> bool {
        self.levels.iter().any(|level| level.contains_scope(scope))
    }

    /// Register a demand for `key` on the ancestor that should provide it
    ///
    /// The nearest ancestor that already has the key wins; otherwise the
    /// nearest ancestor declaring `scope`. Returns `None` when neither exists.
    pub fn mark(&self, key: &TypeKey, scope: &Annotation) -> Option<PropertyAccess> {
        let level = self
            .levels
            .iter()
            .rev()
            .find(|level| level.contains(key))
            .or_else(|| {
                self.levels
                    .iter()
                    .rev()
                    .find(|level| level.contains_scope(scope))
            })?;
        Some(level.mark(key))
    }

    /// The direct parent every access is routed through
    pub fn current_parent_graph(&self) -> Option<&ParentLevel> {
        self.levels.last().map(Arc::as_ref)
    }

    /// Union of the keys demanded from every level
    pub fn demanded_keys(&self) -> BTreeSet<TypeKey> {
        self.levels
            .iter()
            .flat_map(|level| level.demanded_keys())
            .collect()
    }
}
