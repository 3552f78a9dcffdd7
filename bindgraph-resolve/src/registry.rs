//! Statically declared bindings of one graph

use crate::error::{ResolveError, Result};
use crate::multibinding::{compute_multibinding_key, MultibindingAccumulator, MultibindsDeclaration};
use bindgraph_core::{Binding, FrameworkSymbols, TypeKey};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Provided, alias and members-injector declarations
///
/// Each kind lives in its own map so that overwriting one kind never shadows
/// another. The registry also owns the graph's multibinding accumulator,
/// since registering a contributor is the one side effect of [`put`].
///
/// [`put`]: BindingRegistry::put
#[derive(Debug, Default)]
pub struct BindingRegistry {
    provided: FxHashMap<TypeKey, Arc<Binding>>,
    aliases: FxHashMap<TypeKey, Arc<Binding>>,
    members_injectors: FxHashMap<TypeKey, Arc<Binding>>,
    optional_keys: FxHashSet<TypeKey>,
    multibindings: MultibindingAccumulator,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a static binding under its key
    ///
    /// Multibinding contributors are also recorded with the accumulator.
    pub fn put(&mut self, binding: Binding, symbols: &FrameworkSymbols) -> Result<Arc<Binding>> {
        let key = binding.type_key().clone();
        let collection = match binding.contribution() {
            Some(contribution) => Some(compute_multibinding_key(
                contribution,
                &binding.contextual_type_key(),
                &binding.render_short(),
                symbols,
            )?),
            None => None,
        };

        let binding = Arc::new(binding);
        let target = match binding.as_ref() {
            Binding::Provided(_) => &mut self.provided,
            Binding::Alias(_) => &mut self.aliases,
            Binding::MembersInjected(_) => &mut self.members_injectors,
            other => {
                return Err(ResolveError::compiler_bug(format!(
                    "{} is not a static binding",
                    other
                )))
            }
        };
        target.insert(key.clone(), Arc::clone(&binding));
        trace!("Registered {}", binding);

        if let Some(collection) = collection {
            self.multibindings.register_contribution(collection, key, symbols);
        }
        Ok(binding)
    }

    /// Remove every static declaration for `key`
    ///
    /// Materialized multibindings keep their recorded sources.
    pub fn remove(&mut self, key: &TypeKey) -> bool {
        let provided = self.provided.remove(key).is_some();
        let alias = self.aliases.remove(key).is_some();
        let members = self.members_injectors.remove(key).is_some();
        provided || alias || members
    }

    pub fn remove_provided(&mut self, key: &TypeKey) -> Option<Arc<Binding>> {
        self.provided.remove(key)
    }

    pub fn remove_alias(&mut self, key: &TypeKey) -> Option<Arc<Binding>> {
        self.aliases.remove(key)
    }

    pub fn provided(&self, key: &TypeKey) -> Option<&Arc<Binding>> {
        self.provided.get(key)
    }

    pub fn alias(&self, key: &TypeKey) -> Option<&Arc<Binding>> {
        self.aliases.get(key)
    }

    pub fn members_injector(&self, key: &TypeKey) -> Option<&Arc<Binding>> {
        self.members_injectors.get(key)
    }

    /// Fetch a members-injector binding, creating it on first use
    pub fn members_injector_or_insert_with(
        &mut self,
        key: TypeKey,
        create: impl FnOnce() -> Binding,
    ) -> Arc<Binding> {
        Arc::clone(
            self.members_injectors
                .entry(key)
                .or_insert_with(|| Arc::new(create())),
        )
    }

    /// A provided or alias declaration for `key`
    pub fn static_binding(&self, key: &TypeKey) -> Option<&Arc<Binding>> {
        self.provided.get(key).or_else(|| self.aliases.get(key))
    }

    /// All provided and alias declarations, ordered by key
    pub fn available_static_bindings(&self) -> BTreeMap<TypeKey, Arc<Binding>> {
        self.provided
            .iter()
            .chain(self.aliases.iter())
            .map(|(key, binding)| (key.clone(), Arc::clone(binding)))
            .collect()
    }

    /// Every collection known to the accumulator, materialized
    pub fn available_multibindings(
        &mut self,
        symbols: &FrameworkSymbols,
    ) -> BTreeMap<TypeKey, Arc<Binding>> {
        self.multibindings.available(symbols)
    }

    pub fn register_multibinds(
        &mut self,
        collection: TypeKey,
        declaration: MultibindsDeclaration,
        symbols: &FrameworkSymbols,
    ) {
        self.multibindings
            .register_declaration(collection, declaration, symbols);
    }

    /// Declare `key` (an optional-wrapper type) as an optional binding
    pub fn declare_optional(&mut self, key: TypeKey) {
        self.optional_keys.insert(key);
    }

    pub fn is_optional(&self, key: &TypeKey) -> bool {
        self.optional_keys.contains(key)
    }

    pub fn multibindings(&self) -> &MultibindingAccumulator {
        &self.multibindings
    }

    pub fn multibindings_mut(&mut self) -> &mut MultibindingAccumulator {
        &mut self.multibindings
    }

    pub fn len(&self) -> usize {
        self.provided.len() + self.aliases.len() + self.members_injectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
