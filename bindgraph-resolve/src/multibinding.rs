//! Multibinding accumulation
//!
//! Contributors are recorded by the key of the collection they feed. The
//! collection binding itself is only built when something looks the
//! collection up, and is rebuilt if more contributions arrive afterwards.

use crate::error::{ResolveError, Result};
use bindgraph_core::{
    Annotation, AnnotationArg, Binding, CallableId, CollectionKind, ContextualTypeKey,
    ContributionKind, CoreError, FrameworkSymbols, MultibindingBinding, MultibindingContribution,
    SourceLocation, TypeKey, TypeRef,
};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::trace;

/// An explicit "this collection exists" declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultibindsDeclaration {
    pub callable: CallableId,
    pub allow_empty: bool,
    pub location: Option<SourceLocation>,
}

impl MultibindsDeclaration {
    pub fn new(callable: CallableId, allow_empty: bool) -> Self {
        Self {
            callable,
            allow_empty,
            location: None,
        }
    }
}

/// A unique key for one contributor to a collection
///
/// Contributors of the same element type would otherwise collide in the
/// registry, so each gets a qualifier naming its declaration.
pub fn contributor_key(ty: TypeRef, callable: &CallableId) -> TypeKey {
    TypeKey::qualified(
        ty,
        Annotation::new("MultibindingElement")
            .with_arg("id", AnnotationArg::Str(format!("{}.{}", callable.owner, callable.name))),
    )
}

/// Compute the key of the collection a contributor feeds
pub fn compute_multibinding_key(
    contribution: &MultibindingContribution,
    contributor: &ContextualTypeKey,
    declaration: &str,
    symbols: &FrameworkSymbols,
) -> Result<TypeKey> {
    let contributed = &contributor.type_key.ty;
    let qualifier = contribution.original_qualifier.clone();
    match contribution.kind {
        ContributionKind::IntoSet => Ok(TypeKey {
            ty: symbols.set_of(contributed.clone()),
            qualifier,
        }),
        ContributionKind::ElementsIntoSet => {
            let element = contributed.single_argument().ok_or_else(|| CoreError::MalformedType {
                ty: contributed.to_string(),
                reason: format!(
                    "elements-into-set contributor {} must return a collection type",
                    declaration
                ),
            })?;
            Ok(TypeKey {
                ty: symbols.set_of(element.clone()),
                qualifier,
            })
        }
        ContributionKind::IntoMap => match contribution.map_keys.as_slice() {
            [map_key] => Ok(TypeKey {
                ty: symbols.map_of(map_key.key_type.clone(), contributed.clone()),
                qualifier,
            }),
            [] => Err(ResolveError::compiler_bug(format!(
                "Missing map key for into-map contributor {}",
                declaration
            ))),
            _ => Err(ResolveError::compiler_bug(format!(
                "Multiple map keys for into-map contributor {}",
                declaration
            ))),
        },
    }
}

/// `Map<K, Provider<V>>` for a `Map<K, V>` key
fn deferred_map_key(key: &TypeKey, symbols: &FrameworkSymbols) -> Option<TypeKey> {
    match key.ty.arguments() {
        [map_key, value] if key.ty.is_class(&symbols.map) => Some(key.with_type(
            symbols.map_of(map_key.clone(), symbols.provider_of(value.clone())),
        )),
        _ => None,
    }
}

/// Per-graph contribution and declaration records
#[derive(Debug, Default)]
pub struct MultibindingAccumulator {
    contributions: FxHashMap<TypeKey, BTreeSet<TypeKey>>,
    declarations: FxHashMap<TypeKey, MultibindsDeclaration>,
    cache: FxHashMap<TypeKey, Arc<Binding>>,
}

impl MultibindingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `source` contributes to `collection`
    pub fn register_contribution(
        &mut self,
        collection: TypeKey,
        source: TypeKey,
        symbols: &FrameworkSymbols,
    ) {
        trace!("Contribution {} -> {}", source, collection);
        self.invalidate(&collection, symbols);
        self.contributions.entry(collection).or_default().insert(source);
    }

    /// Record an explicit declaration, merging `allow_empty` with any earlier one
    pub fn register_declaration(
        &mut self,
        collection: TypeKey,
        declaration: MultibindsDeclaration,
        symbols: &FrameworkSymbols,
    ) {
        self.invalidate(&collection, symbols);
        let merged = match self.declarations.get(&collection) {
            Some(existing) => MultibindsDeclaration {
                allow_empty: existing.allow_empty || declaration.allow_empty,
                ..declaration
            },
            None => declaration,
        };
        self.declarations.insert(collection, merged);
    }

    fn invalidate(&mut self, collection: &TypeKey, symbols: &FrameworkSymbols) {
        if self.cache.remove(collection).is_some() {
            trace!("Dropped materialized multibinding {}", collection);
            if let Some(deferred) = deferred_map_key(collection, symbols) {
                self.cache.remove(&deferred);
            }
        }
    }

    pub fn contributions(&self, collection: &TypeKey) -> Option<&BTreeSet<TypeKey>> {
        self.contributions.get(collection)
    }

    pub fn declaration(&self, collection: &TypeKey) -> Option<&MultibindsDeclaration> {
        self.declarations.get(collection)
    }

    /// Whether `key` is known as a collection, materialized or not
    pub fn is_collection(&self, key: &TypeKey) -> bool {
        self.cache.contains_key(key)
            || self.contributions.contains_key(key)
            || self.declarations.contains_key(key)
    }

    /// Build or fetch the multibinding for `key`
    ///
    /// Returns `None` when nothing contributes to or declares the collection.
    pub fn get_or_create(&mut self, key: &TypeKey, symbols: &FrameworkSymbols) -> Option<Arc<Binding>> {
        if let Some(binding) = self.cache.get(key) {
            return Some(Arc::clone(binding));
        }

        let contributions = self.contributions.get(key);
        let declaration = self.declarations.get(key);
        if contributions.is_none() && declaration.is_none() {
            return None;
        }

        let collection = if key.ty.is_class(&symbols.map) {
            CollectionKind::Map
        } else {
            CollectionKind::Set
        };
        let multibinding = MultibindingBinding {
            type_key: key.clone(),
            collection,
            allow_empty: declaration.map_or(false, |d| d.allow_empty),
            source_bindings: contributions.cloned().unwrap_or_default(),
            declaration: declaration.map(|d| d.callable.clone()),
            location: declaration.and_then(|d| d.location.clone()),
        };
        trace!(
            "Materialized multibinding {} with {} source(s)",
            key,
            multibinding.source_bindings.len()
        );

        let binding = Arc::new(Binding::Multibinding(multibinding));
        self.cache.insert(key.clone(), Arc::clone(&binding));
        if let Some(deferred) = deferred_map_key(key, symbols) {
            self.cache.insert(deferred, Arc::clone(&binding));
        }
        Some(binding)
    }

    /// Materialize every declared or contributed collection
    pub fn available(&mut self, symbols: &FrameworkSymbols) -> BTreeMap<TypeKey, Arc<Binding>> {
        let keys: BTreeSet<TypeKey> = self
            .contributions
            .keys()
            .chain(self.declarations.keys())
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|key| {
                let binding = self.get_or_create(&key, symbols)?;
                Some((key, binding))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindgraph_core::MapKey;

    fn symbols() -> FrameworkSymbols {
        FrameworkSymbols::default()
    }

    fn plugin_contributor(name: &str) -> TypeKey {
        contributor_key(
            TypeRef::simple("Plugin"),
            &CallableId::new("app.PluginModule", name),
        )
    }

    fn set_of_plugins() -> TypeKey {
        TypeKey::new(symbols().set_of(TypeRef::simple("Plugin")))
    }

    #[test]
    fn test_into_set_key_uses_original_qualifier() {
        let contributor = ContextualTypeKey::new(plugin_contributor("a"));
        let contribution = MultibindingContribution::into_set()
            .with_original_qualifier(Some(Annotation::named("core")));

        let key = compute_multibinding_key(&contribution, &contributor, "a", &symbols()).unwrap();
        assert_eq!(
            key,
            TypeKey::qualified(symbols().set_of(TypeRef::simple("Plugin")), Annotation::named("core"))
        );
    }

    #[test]
    fn test_elements_into_set_unwraps_element() {
        let contributor = ContextualTypeKey::new(TypeKey::new(TypeRef::generic(
            "Set",
            [TypeRef::simple("Plugin")],
        )));
        let key = compute_multibinding_key(
            &MultibindingContribution::elements_into_set(),
            &contributor,
            "plugins",
            &symbols(),
        )
        .unwrap();
        assert_eq!(key, set_of_plugins());

        let bare = ContextualTypeKey::new(TypeKey::simple("Plugin"));
        let err = compute_multibinding_key(
            &MultibindingContribution::elements_into_set(),
            &bare,
            "plugin",
            &symbols(),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::Core(CoreError::MalformedType { .. })));
    }

    #[test]
    fn test_into_map_requires_map_key() {
        let contributor = ContextualTypeKey::new(plugin_contributor("a"));
        let keyed = MultibindingContribution::into_map(MapKey::string("a"));
        let key = compute_multibinding_key(&keyed, &contributor, "a", &symbols()).unwrap();
        assert_eq!(
            key.ty,
            symbols().map_of(TypeRef::simple("String"), TypeRef::simple("Plugin"))
        );
        assert!(key.qualifier.is_none());

        let mut missing = keyed.clone();
        missing.map_keys.clear();
        let err = compute_multibinding_key(&missing, &contributor, "a", &symbols()).unwrap_err();
        assert!(matches!(err, ResolveError::CompilerBug { .. }));
    }

    #[test]
    fn test_unknown_collection_is_not_a_multibinding() {
        let mut accumulator = MultibindingAccumulator::new();
        assert!(accumulator.get_or_create(&set_of_plugins(), &symbols()).is_none());
    }

    #[test]
    fn test_materialized_binding_is_cached() {
        let symbols = symbols();
        let mut accumulator = MultibindingAccumulator::new();
        accumulator.register_contribution(set_of_plugins(), plugin_contributor("a"), &symbols);

        let first = accumulator.get_or_create(&set_of_plugins(), &symbols).unwrap();
        let second = accumulator.get_or_create(&set_of_plugins(), &symbols).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_late_contribution_rebuilds_collection() {
        let symbols = symbols();
        let mut accumulator = MultibindingAccumulator::new();
        accumulator.register_contribution(set_of_plugins(), plugin_contributor("a"), &symbols);
        let before = accumulator.get_or_create(&set_of_plugins(), &symbols).unwrap();

        accumulator.register_contribution(set_of_plugins(), plugin_contributor("b"), &symbols);
        let after = accumulator.get_or_create(&set_of_plugins(), &symbols).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.dependencies().len(), 2);
    }

    #[test]
    fn test_map_is_cached_under_deferred_value_key() {
        let symbols = symbols();
        let mut accumulator = MultibindingAccumulator::new();
        let map_key = TypeKey::new(symbols.map_of(TypeRef::simple("String"), TypeRef::simple("Plugin")));
        accumulator.register_contribution(map_key.clone(), plugin_contributor("a"), &symbols);

        let plain = accumulator.get_or_create(&map_key, &symbols).unwrap();
        let deferred_key = deferred_map_key(&map_key, &symbols).unwrap();
        assert_eq!(
            deferred_key.ty,
            symbols.map_of(
                TypeRef::simple("String"),
                symbols.provider_of(TypeRef::simple("Plugin"))
            )
        );
        let deferred = accumulator.get_or_create(&deferred_key, &symbols).unwrap();
        assert!(Arc::ptr_eq(&plain, &deferred));
    }

    #[test]
    fn test_declarations_merge_allow_empty() {
        let symbols = symbols();
        let mut accumulator = MultibindingAccumulator::new();
        let callable = CallableId::new("app.AppGraph", "plugins");
        accumulator.register_declaration(
            set_of_plugins(),
            MultibindsDeclaration::new(callable.clone(), true),
            &symbols,
        );
        accumulator.register_declaration(
            set_of_plugins(),
            MultibindsDeclaration::new(callable, false),
            &symbols,
        );

        let binding = accumulator.get_or_create(&set_of_plugins(), &symbols).unwrap();
        match binding.as_ref() {
            Binding::Multibinding(m) => {
                assert!(m.allow_empty);
                assert!(m.source_bindings.is_empty());
                assert!(m.is_set());
            }
            other => panic!("unexpected binding {}", other),
        }
    }

    #[test]
    fn test_available_materializes_everything() {
        let symbols = symbols();
        let mut accumulator = MultibindingAccumulator::new();
        accumulator.register_contribution(set_of_plugins(), plugin_contributor("a"), &symbols);
        let strings = TypeKey::new(symbols.set_of(TypeRef::simple("String")));
        accumulator.register_declaration(
            strings.clone(),
            MultibindsDeclaration::new(CallableId::new("app.AppGraph", "strings"), true),
            &symbols,
        );

        let available = accumulator.available(&symbols);
        assert_eq!(available.len(), 2);
        assert!(available.contains_key(&strings));
        assert!(available.contains_key(&set_of_plugins()));
    }
}
