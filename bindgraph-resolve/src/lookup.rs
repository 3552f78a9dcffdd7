//! The binding lookup driver
//!
//! [`BindingLookup::lookup`] is the single entry point for turning a requested
//! key into bindings. Sources are consulted in a fixed priority order and the
//! first one that answers wins:
//!
//! 1. provided declarations
//! 2. alias declarations
//! 3. lazily materialized parent keys
//! 4. multibindings
//! 5. class derivation
//!
//! Scoped answers from (1) and (5) are routed through an ancestor graph when
//! one already provides the key or declares the scope.

use crate::class_binding::ClassBindingDeriver;
use crate::context::ResolutionContext;
use crate::error::{ResolveError, Result};
use crate::parent::ParentContext;
use crate::registry::BindingRegistry;
use crate::stack::BindingStack;
use bindgraph_core::{
    Annotation, Binding, ClassId, ContextualTypeKey, GraphDependencyBinding, TypeKey,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type BindingFactory = Box<dyn FnOnce() -> Binding + Send>;

/// A binding built on first access
struct LazyBinding {
    create: Option<BindingFactory>,
    value: Option<Arc<Binding>>,
}

impl LazyBinding {
    fn force(&mut self) -> Result<Arc<Binding>> {
        if let Some(value) = &self.value {
            return Ok(Arc::clone(value));
        }
        let create = self
            .create
            .take()
            .ok_or_else(|| ResolveError::compiler_bug("Lazy parent binding lost its factory"))?;
        let value = Arc::new(create());
        self.value = Some(Arc::clone(&value));
        Ok(value)
    }
}

impl fmt::Debug for LazyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "LazyBinding({})", value),
            None => f.write_str("LazyBinding(<pending>)"),
        }
    }
}

#[derive(Debug)]
pub struct BindingLookup {
    graph: ClassId,
    registry: BindingRegistry,
    class_bindings: FxHashMap<ContextualTypeKey, Vec<Arc<Binding>>>,
    parent_dependencies: FxHashMap<(ClassId, TypeKey), Arc<Binding>>,
    lazy_parent_keys: FxHashMap<TypeKey, LazyBinding>,
    parent: Option<ParentContext>,
}

impl BindingLookup {
    pub fn new(graph: ClassId, registry: BindingRegistry) -> Self {
        Self {
            graph,
            registry,
            class_bindings: FxHashMap::default(),
            parent_dependencies: FxHashMap::default(),
            lazy_parent_keys: FxHashMap::default(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: ParentContext) -> Self {
        if !parent.is_empty() {
            self.parent = Some(parent);
        }
        self
    }

    pub fn graph(&self) -> &ClassId {
        &self.graph
    }

    pub fn parent(&self) -> Option<&ParentContext> {
        self.parent.as_ref()
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BindingRegistry {
        &mut self.registry
    }

    /// Register a key whose binding is only built if something asks for it
    pub fn add_lazy_parent_key(
        &mut self,
        key: TypeKey,
        create: impl FnOnce() -> Binding + Send + 'static,
    ) {
        self.lazy_parent_keys.insert(
            key,
            LazyBinding {
                create: Some(Box::new(create)),
                value: None,
            },
        );
    }

    pub fn available_static_bindings(&self) -> BTreeMap<TypeKey, Arc<Binding>> {
        self.registry.available_static_bindings()
    }

    pub fn available_multibindings(
        &mut self,
        ctx: &ResolutionContext,
    ) -> BTreeMap<TypeKey, Arc<Binding>> {
        self.registry.available_multibindings(&ctx.symbols)
    }

    /// Resolve `contextual_key` into candidate bindings
    ///
    /// `current_bindings` holds the keys already in the graph being built and
    /// keeps derived members-injector bindings from being returned twice. An
    /// empty result means the key is missing.
    pub fn lookup(
        &mut self,
        ctx: &mut ResolutionContext,
        contextual_key: &ContextualTypeKey,
        current_bindings: &FxHashSet<TypeKey>,
        stack: &BindingStack,
    ) -> Result<Vec<Arc<Binding>>> {
        let key = &contextual_key.type_key;

        if let Some(provided) = self.registry.provided(key).cloned() {
            if let (Some(scope), Some(parent)) = (provided.scope(), self.parent.as_ref()) {
                if parent.contains(key) {
                    let scope = scope.clone();
                    return Ok(vec![self.promote(key, &scope)?]);
                }
            }
            trace!("Provided binding for {}", key);
            return Ok(vec![provided]);
        }

        // Aliases are promoted, if at all, when their target is looked up
        if let Some(alias) = self.registry.alias(key) {
            trace!("Alias binding for {}", key);
            return Ok(vec![Arc::clone(alias)]);
        }

        if let Some(lazy) = self.lazy_parent_keys.get_mut(key) {
            trace!("Parent binding for {}", key);
            return Ok(vec![lazy.force()?]);
        }

        if let Some(multibinding) = self
            .registry
            .multibindings_mut()
            .get_or_create(key, &ctx.symbols)
        {
            return Ok(vec![multibinding]);
        }

        let derived = match self.class_bindings.get(contextual_key) {
            Some(cached) => {
                trace!("Class binding cache hit for {}", contextual_key);
                cached.clone()
            }
            None => {
                trace!("Class binding cache miss for {}", contextual_key);
                let derived = ClassBindingDeriver::new(ctx, &mut self.registry, &self.graph)
                    .derive(contextual_key, current_bindings, stack)?;
                // Members-injector results depend on the current bindings
                if !key.ty.is_class(&ctx.symbols.members_injector) {
                    self.class_bindings
                        .insert(contextual_key.clone(), derived.clone());
                }
                derived
            }
        };

        let Some(parent) = self.parent.clone() else {
            return Ok(derived);
        };
        let mut resolved = Vec::with_capacity(derived.len());
        for binding in derived {
            let promotable = match binding.scope() {
                Some(scope)
                    if parent.contains(binding.type_key()) || parent.contains_scope(scope) =>
                {
                    Some(scope.clone())
                }
                _ => None,
            };
            match promotable {
                Some(scope) => resolved.push(self.promote(binding.type_key(), &scope)?),
                None => resolved.push(binding),
            }
        }
        Ok(resolved)
    }

    /// Route `key` through the parent graph, reusing an earlier route
    fn promote(&mut self, key: &TypeKey, scope: &Annotation) -> Result<Arc<Binding>> {
        let parent = self
            .parent
            .as_ref()
            .ok_or_else(|| ResolveError::compiler_bug(format!("Promoted {} without a parent", key)))?;
        let access = parent.mark(key, scope).ok_or_else(|| {
            ResolveError::compiler_bug(format!("No ancestor of {} can provide {}", self.graph, key))
        })?;
        let parent_graph = parent.current_parent_graph().ok_or_else(|| {
            ResolveError::compiler_bug(format!("{} has an empty parent context", self.graph))
        })?;

        let cache_key = (parent_graph.graph().clone(), key.clone());
        let owner_key = parent_graph.graph_key().clone();
        let graph = self.graph.clone();
        let binding = self.parent_dependencies.entry(cache_key).or_insert_with(|| {
            trace!("Routing {} through {}", key, owner_key);
            Arc::new(Binding::GraphDependency(GraphDependencyBinding {
                owner_key,
                graph,
                property_access: access,
                type_key: key.clone(),
                scope: Some(scope.clone()),
            }))
        });
        Ok(Arc::clone(binding))
    }
}

#[cfg(test)]
#[path = "lookup_tests.rs"]
mod tests;
