//! Graph declarations and resolved binding graphs

use crate::error::{ResolveError, Result};
use crate::multibinding::MultibindsDeclaration;
use bindgraph_core::{
    AliasBinding, Annotation, Binding, CallableId, ClassId, ContextualTypeKey,
    GraphExtensionBinding, MembersInjectedBinding, ProvidedBinding, SourceLocation, TypeKey,
};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// An accessor the graph exposes, e.g. `val repo: Repo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphAccessor {
    pub name: String,
    pub contextual_key: ContextualTypeKey,
}

/// An injector function, e.g. `fun inject(target: Screen)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphInjector {
    pub name: String,
    /// `MembersInjector<T>` for the injected type
    pub contextual_key: ContextualTypeKey,
}

/// A graph whose accessors are readable from this graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedGraph {
    pub graph_key: TypeKey,
    /// Exposed key and the accessor that reads it
    pub accessors: Vec<(TypeKey, String)>,
}

/// A storage slot an earlier pass already committed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedProperty {
    pub name: String,
    pub has_getter: bool,
    pub has_field: bool,
}

/// Everything declared on one graph
#[derive(Debug, Clone)]
pub struct GraphDeclaration {
    pub id: ClassId,
    pub type_key: TypeKey,
    pub scopes: BTreeSet<Annotation>,
    pub provided: Vec<ProvidedBinding>,
    pub aliases: Vec<AliasBinding>,
    pub members_injectors: Vec<MembersInjectedBinding>,
    pub multibinds: Vec<(TypeKey, MultibindsDeclaration)>,
    pub optional_keys: Vec<TypeKey>,
    /// Graph inputs as key and parameter name
    pub bound_instances: Vec<(TypeKey, String)>,
    pub included_graphs: Vec<IncludedGraph>,
    pub extensions: Vec<GraphExtensionBinding>,
    pub extension_factories: Vec<GraphExtensionBinding>,
    pub accessors: Vec<GraphAccessor>,
    pub injectors: Vec<GraphInjector>,
    pub reserved_properties: FxHashMap<TypeKey, ReservedProperty>,
    pub location: Option<SourceLocation>,
}

impl GraphDeclaration {
    pub fn new(id: impl Into<ClassId>) -> Self {
        let id = id.into();
        Self {
            type_key: TypeKey::simple(id.clone()),
            id,
            scopes: BTreeSet::new(),
            provided: Vec::new(),
            aliases: Vec::new(),
            members_injectors: Vec::new(),
            multibinds: Vec::new(),
            optional_keys: Vec::new(),
            bound_instances: Vec::new(),
            included_graphs: Vec::new(),
            extensions: Vec::new(),
            extension_factories: Vec::new(),
            accessors: Vec::new(),
            injectors: Vec::new(),
            reserved_properties: FxHashMap::default(),
            location: None,
        }
    }

    pub fn scoped(mut self, scope: Annotation) -> Self {
        self.scopes.insert(scope);
        self
    }

    pub fn provides(mut self, binding: ProvidedBinding) -> Self {
        self.provided.push(binding);
        self
    }

    pub fn binds(mut self, binding: AliasBinding) -> Self {
        self.aliases.push(binding);
        self
    }

    /// Declare an injector function binding
    pub fn injects_members(mut self, binding: MembersInjectedBinding) -> Self {
        self.members_injectors.push(binding);
        self
    }

    pub fn multibinds(mut self, key: TypeKey, declaration: MultibindsDeclaration) -> Self {
        self.multibinds.push((key, declaration));
        self
    }

    pub fn optional(mut self, key: TypeKey) -> Self {
        self.optional_keys.push(key);
        self
    }

    pub fn bound_instance(mut self, key: TypeKey, name: impl Into<String>) -> Self {
        self.bound_instances.push((key, name.into()));
        self
    }

    pub fn includes(mut self, graph: IncludedGraph) -> Self {
        self.included_graphs.push(graph);
        self
    }

    pub fn extension(mut self, extension: impl Into<ClassId>, accessor: Option<CallableId>) -> Self {
        let binding = self.extension_binding(extension.into(), accessor);
        self.extensions.push(binding);
        self
    }

    pub fn extension_factory(
        mut self,
        factory: impl Into<ClassId>,
        accessor: Option<CallableId>,
    ) -> Self {
        let binding = self.extension_binding(factory.into(), accessor);
        self.extension_factories.push(binding);
        self
    }

    fn extension_binding(&self, extension: ClassId, accessor: Option<CallableId>) -> GraphExtensionBinding {
        GraphExtensionBinding {
            type_key: TypeKey::simple(extension.clone()),
            extension,
            parent_graph: self.id.clone(),
            accessor,
        }
    }

    pub fn accessor(mut self, name: impl Into<String>, contextual_key: ContextualTypeKey) -> Self {
        self.accessors.push(GraphAccessor {
            name: name.into(),
            contextual_key,
        });
        self
    }

    pub fn injector(mut self, name: impl Into<String>, contextual_key: ContextualTypeKey) -> Self {
        self.injectors.push(GraphInjector {
            name: name.into(),
            contextual_key,
        });
        self
    }

    pub fn reserve(mut self, key: TypeKey, property: ReservedProperty) -> Self {
        self.reserved_properties.insert(key, property);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// A root the graph was traversed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphRoot {
    Accessor(GraphAccessor),
    Injector(GraphInjector),
}

impl GraphRoot {
    pub fn contextual_key(&self) -> &ContextualTypeKey {
        match self {
            GraphRoot::Accessor(a) => &a.contextual_key,
            GraphRoot::Injector(i) => &i.contextual_key,
        }
    }
}

/// The bindings reachable from a graph's roots
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    id: ClassId,
    type_key: TypeKey,
    scopes: BTreeSet<Annotation>,
    bindings: BTreeMap<TypeKey, Arc<Binding>>,
    roots: Vec<GraphRoot>,
    reserved_properties: FxHashMap<TypeKey, ReservedProperty>,
    pruned: Vec<TypeKey>,
}

impl ResolvedGraph {
    pub(crate) fn new(
        declaration: &GraphDeclaration,
        bindings: BTreeMap<TypeKey, Arc<Binding>>,
        roots: Vec<GraphRoot>,
        pruned: Vec<TypeKey>,
    ) -> Self {
        Self {
            id: declaration.id.clone(),
            type_key: declaration.type_key.clone(),
            scopes: declaration.scopes.clone(),
            bindings,
            roots,
            reserved_properties: declaration.reserved_properties.clone(),
            pruned,
        }
    }

    pub fn id(&self) -> &ClassId {
        &self.id
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    pub fn scopes(&self) -> &BTreeSet<Annotation> {
        &self.scopes
    }

    pub fn bindings(&self) -> &BTreeMap<TypeKey, Arc<Binding>> {
        &self.bindings
    }

    pub fn roots(&self) -> &[GraphRoot] {
        &self.roots
    }

    /// Static declarations dropped because nothing reached them
    pub fn pruned(&self) -> &[TypeKey] {
        &self.pruned
    }

    pub fn find_binding(&self, key: &TypeKey) -> Option<&Arc<Binding>> {
        self.bindings.get(key)
    }

    /// The binding for a dependency that resolution must have produced
    pub fn require_binding(&self, key: &ContextualTypeKey) -> Result<&Arc<Binding>> {
        self.bindings.get(&key.type_key).ok_or_else(|| {
            ResolveError::compiler_bug(format!("No binding for {} in graph {}", key, self.id))
        })
    }

    pub fn reserved_property(&self, key: &TypeKey) -> Option<&ReservedProperty> {
        self.reserved_properties.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
