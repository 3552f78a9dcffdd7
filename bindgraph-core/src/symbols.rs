//! Well-known framework classes the resolver gives special meaning to

use crate::types::{ClassId, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Class ids for collection, wrapper and injector types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkSymbols {
    pub set: ClassId,
    pub map: ClassId,
    /// The provider type used when the resolver itself wraps a key
    pub provider: ClassId,
    /// Every class recognized as a provider wrapper, including `provider`
    pub provider_types: BTreeSet<ClassId>,
    pub lazy: ClassId,
    pub lazy_types: BTreeSet<ClassId>,
    pub members_injector: ClassId,
    pub optional_types: BTreeSet<ClassId>,
}

impl Default for FrameworkSymbols {
    fn default() -> Self {
        let provider = ClassId::new("Provider");
        let lazy = ClassId::new("Lazy");
        Self {
            set: ClassId::new("Set"),
            map: ClassId::new("Map"),
            provider_types: BTreeSet::from([provider.clone()]),
            provider,
            lazy_types: BTreeSet::from([lazy.clone()]),
            lazy,
            members_injector: ClassId::new("MembersInjector"),
            optional_types: BTreeSet::from([ClassId::new("Optional")]),
        }
    }
}

impl FrameworkSymbols {
    /// Register additional provider-like classes
    pub fn with_provider_types(mut self, types: impl IntoIterator<Item = ClassId>) -> Self {
        self.provider_types.extend(types);
        self
    }

    /// Register additional lazy-like classes
    pub fn with_lazy_types(mut self, types: impl IntoIterator<Item = ClassId>) -> Self {
        self.lazy_types.extend(types);
        self
    }

    /// Replace the set of optional wrapper classes
    pub fn with_optional_types(mut self, types: impl IntoIterator<Item = ClassId>) -> Self {
        self.optional_types = types.into_iter().collect();
        self
    }

    pub fn is_provider(&self, id: &ClassId) -> bool {
        self.provider_types.contains(id)
    }

    pub fn is_lazy(&self, id: &ClassId) -> bool {
        self.lazy_types.contains(id)
    }

    pub fn is_optional(&self, id: &ClassId) -> bool {
        self.optional_types.contains(id)
    }

    pub fn set_of(&self, element: TypeRef) -> TypeRef {
        TypeRef::generic(self.set.clone(), [element])
    }

    pub fn map_of(&self, key: TypeRef, value: TypeRef) -> TypeRef {
        TypeRef::generic(self.map.clone(), [key, value])
    }

    pub fn provider_of(&self, ty: TypeRef) -> TypeRef {
        TypeRef::generic(self.provider.clone(), [ty])
    }

    pub fn lazy_of(&self, ty: TypeRef) -> TypeRef {
        TypeRef::generic(self.lazy.clone(), [ty])
    }

    pub fn members_injector_of(&self, ty: TypeRef) -> TypeRef {
        TypeRef::generic(self.members_injector.clone(), [ty])
    }
}
