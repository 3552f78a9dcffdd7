//! The binding taxonomy
//!
//! A [`Binding`] answers "how is an instance of this key produced". The set of
//! variants is closed; every consumer (storage planning, metadata export,
//! diagnostics) matches on it exhaustively so adding a variant forces every
//! site to decide how to treat it.

use crate::annotation::{Annotation, MapKey};
use crate::class::{ClassFactory, FactoryFunction};
use crate::declaration::{CallableId, DeclarationRef, Parameter, SourceLocation};
use crate::key::{ContextualTypeKey, TypeKey};
use crate::types::ClassId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a contributor feeds a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContributionKind {
    /// One element into a set
    IntoSet,
    /// A whole collection of elements into a set
    ElementsIntoSet,
    /// One entry into a map, keyed by a map-key annotation
    IntoMap,
}

/// Multibinding annotations on a provider or alias declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultibindingContribution {
    pub kind: ContributionKind,
    pub map_keys: Vec<MapKey>,
    /// The qualifier the user wrote, before the contributor got its own
    /// unique key
    pub original_qualifier: Option<Annotation>,
}

impl MultibindingContribution {
    pub fn into_set() -> Self {
        Self {
            kind: ContributionKind::IntoSet,
            map_keys: Vec::new(),
            original_qualifier: None,
        }
    }

    pub fn elements_into_set() -> Self {
        Self {
            kind: ContributionKind::ElementsIntoSet,
            ..Self::into_set()
        }
    }

    pub fn into_map(key: MapKey) -> Self {
        Self {
            kind: ContributionKind::IntoMap,
            map_keys: vec![key],
            original_qualifier: None,
        }
    }

    pub fn with_original_qualifier(mut self, qualifier: Option<Annotation>) -> Self {
        self.original_qualifier = qualifier;
        self
    }
}

/// Collection shape of a multibinding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Set,
    Map,
}

/// How a child graph reads a value exposed by an ancestor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    /// Read a stored field
    Field,
    /// Call an accessor
    Getter,
}

/// Descriptor of the ancestor property a child reads through
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyAccess {
    /// Key of the graph that owns the property
    pub owner_key: TypeKey,
    pub property_name: String,
    pub kind: AccessKind,
}

/// A provider function or property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidedBinding {
    pub contextual_type_key: ContextualTypeKey,
    pub scope: Option<Annotation>,
    pub provider: CallableId,
    pub parameters: Vec<Parameter>,
    pub contribution: Option<MultibindingContribution>,
    pub location: Option<SourceLocation>,
}

impl ProvidedBinding {
    pub fn new(type_key: TypeKey, provider: CallableId) -> Self {
        Self {
            contextual_type_key: ContextualTypeKey::new(type_key),
            scope: None,
            provider,
            parameters: Vec::new(),
            contribution: None,
            location: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn scoped(mut self, scope: Annotation) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn contributing(mut self, contribution: MultibindingContribution) -> Self {
        self.contribution = Some(contribution);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// A binding that forwards to another key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasBinding {
    pub contextual_type_key: ContextualTypeKey,
    pub aliased_type: TypeKey,
    /// The binds-like declaration, absent for synthesized aliases
    pub callable: Option<CallableId>,
    pub contribution: Option<MultibindingContribution>,
    pub location: Option<SourceLocation>,
}

impl AliasBinding {
    pub fn new(type_key: TypeKey, aliased_type: TypeKey, callable: Option<CallableId>) -> Self {
        Self {
            contextual_type_key: ContextualTypeKey::new(type_key),
            aliased_type,
            callable,
            contribution: None,
            location: None,
        }
    }

    pub fn contributing(mut self, contribution: MultibindingContribution) -> Self {
        self.contribution = Some(contribution);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// A class built through its injectable constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorInjectedBinding {
    pub class: ClassId,
    pub type_key: TypeKey,
    pub scope: Option<Annotation>,
    /// Constructor signature mapped onto the requested type arguments
    pub factory: ClassFactory,
    /// Member-injector keys applied after construction
    pub injected_members: BTreeSet<ContextualTypeKey>,
    pub location: Option<SourceLocation>,
}

impl ConstructorInjectedBinding {
    pub fn is_assisted(&self) -> bool {
        self.factory.is_assisted()
    }
}

/// An assisted-factory interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistedBinding {
    pub factory_class: ClassId,
    pub type_key: TypeKey,
    pub function: FactoryFunction,
    /// Provider-wrapped key of the type the factory creates
    pub target: ContextualTypeKey,
    pub location: Option<SourceLocation>,
}

impl AssistedBinding {
    /// Keys of the parameters the caller supplies
    pub fn assisted_keys(&self) -> BTreeSet<TypeKey> {
        self.function
            .parameters
            .iter()
            .map(|p| p.contextual_type_key.type_key.clone())
            .collect()
    }
}

/// A set or map assembled from independent contributions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultibindingBinding {
    pub type_key: TypeKey,
    pub collection: CollectionKind,
    pub allow_empty: bool,
    /// Keys of contributing bindings; looked up, never owned
    pub source_bindings: BTreeSet<TypeKey>,
    /// The explicit declaration, when one exists
    pub declaration: Option<CallableId>,
    pub location: Option<SourceLocation>,
}

impl MultibindingBinding {
    pub fn is_map(&self) -> bool {
        self.collection == CollectionKind::Map
    }

    pub fn is_set(&self) -> bool {
        self.collection == CollectionKind::Set
    }
}

/// Member injection for a class, parameters merged across its ancestors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembersInjectedBinding {
    pub type_key: TypeKey,
    pub target_class: ClassId,
    pub parameters: Vec<Parameter>,
    /// Declared as an injector function on the graph rather than derived
    pub is_from_injector_function: bool,
    pub location: Option<SourceLocation>,
}

/// An instance handed to the graph at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundInstanceBinding {
    pub type_key: TypeKey,
    pub name_hint: String,
    /// The graph's own instance
    pub is_graph_itself: bool,
}

/// A singleton object declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectClassBinding {
    pub class: ClassId,
    pub type_key: TypeKey,
    pub location: Option<SourceLocation>,
}

/// A value read from another graph through a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDependencyBinding {
    /// Key of the graph the value is read through
    pub owner_key: TypeKey,
    /// The graph doing the reading
    pub graph: ClassId,
    pub property_access: PropertyAccess,
    pub type_key: TypeKey,
    /// Scope of the promoted binding, if it was promoted from a scoped one
    pub scope: Option<Annotation>,
}

/// A graph-extension accessor or factory accessor on a parent graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExtensionBinding {
    pub type_key: TypeKey,
    pub extension: ClassId,
    pub parent_graph: ClassId,
    pub accessor: Option<CallableId>,
}

/// An optional-style wrapper around another key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomWrapperBinding {
    pub type_key: TypeKey,
    pub wrapper: ClassId,
    /// The wrapped request; carries a default so an absent value is allowed
    pub wrapped: ContextualTypeKey,
}

/// Nothing satisfies the key and the requester falls back to its default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsentBinding {
    pub type_key: TypeKey,
}

/// Discriminant of [`Binding`], for reporting and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Provided,
    Alias,
    ConstructorInjected,
    Assisted,
    Multibinding,
    MembersInjected,
    BoundInstance,
    ObjectClass,
    GraphDependency,
    GraphExtension,
    GraphExtensionFactory,
    CustomWrapper,
    Absent,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A resolved answer for one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    Provided(ProvidedBinding),
    Alias(AliasBinding),
    ConstructorInjected(ConstructorInjectedBinding),
    Assisted(AssistedBinding),
    Multibinding(MultibindingBinding),
    MembersInjected(MembersInjectedBinding),
    BoundInstance(BoundInstanceBinding),
    ObjectClass(ObjectClassBinding),
    GraphDependency(GraphDependencyBinding),
    GraphExtension(GraphExtensionBinding),
    GraphExtensionFactory(GraphExtensionBinding),
    CustomWrapper(CustomWrapperBinding),
    Absent(AbsentBinding),
}

impl Binding {
    pub fn type_key(&self) -> &TypeKey {
        match self {
            Binding::Provided(b) => &b.contextual_type_key.type_key,
            Binding::Alias(b) => &b.contextual_type_key.type_key,
            Binding::ConstructorInjected(b) => &b.type_key,
            Binding::Assisted(b) => &b.type_key,
            Binding::Multibinding(b) => &b.type_key,
            Binding::MembersInjected(b) => &b.type_key,
            Binding::BoundInstance(b) => &b.type_key,
            Binding::ObjectClass(b) => &b.type_key,
            Binding::GraphDependency(b) => &b.type_key,
            Binding::GraphExtension(b) | Binding::GraphExtensionFactory(b) => &b.type_key,
            Binding::CustomWrapper(b) => &b.type_key,
            Binding::Absent(b) => &b.type_key,
        }
    }

    pub fn contextual_type_key(&self) -> ContextualTypeKey {
        match self {
            Binding::Provided(b) => b.contextual_type_key.clone(),
            Binding::Alias(b) => b.contextual_type_key.clone(),
            other => ContextualTypeKey::new(other.type_key().clone()),
        }
    }

    pub fn kind(&self) -> BindingKind {
        match self {
            Binding::Provided(_) => BindingKind::Provided,
            Binding::Alias(_) => BindingKind::Alias,
            Binding::ConstructorInjected(_) => BindingKind::ConstructorInjected,
            Binding::Assisted(_) => BindingKind::Assisted,
            Binding::Multibinding(_) => BindingKind::Multibinding,
            Binding::MembersInjected(_) => BindingKind::MembersInjected,
            Binding::BoundInstance(_) => BindingKind::BoundInstance,
            Binding::ObjectClass(_) => BindingKind::ObjectClass,
            Binding::GraphDependency(_) => BindingKind::GraphDependency,
            Binding::GraphExtension(_) => BindingKind::GraphExtension,
            Binding::GraphExtensionFactory(_) => BindingKind::GraphExtensionFactory,
            Binding::CustomWrapper(_) => BindingKind::CustomWrapper,
            Binding::Absent(_) => BindingKind::Absent,
        }
    }

    pub fn scope(&self) -> Option<&Annotation> {
        match self {
            Binding::Provided(b) => b.scope.as_ref(),
            Binding::ConstructorInjected(b) => b.scope.as_ref(),
            Binding::GraphDependency(b) => b.scope.as_ref(),
            Binding::Alias(_)
            | Binding::Assisted(_)
            | Binding::Multibinding(_)
            | Binding::MembersInjected(_)
            | Binding::BoundInstance(_)
            | Binding::ObjectClass(_)
            | Binding::GraphExtension(_)
            | Binding::GraphExtensionFactory(_)
            | Binding::CustomWrapper(_)
            | Binding::Absent(_) => None,
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.scope().is_some()
    }

    /// Keys this binding needs, in declaration order
    pub fn dependencies(&self) -> Vec<ContextualTypeKey> {
        match self {
            Binding::Provided(b) => b
                .parameters
                .iter()
                .map(|p| p.contextual_type_key.clone())
                .collect(),
            Binding::Alias(b) => vec![ContextualTypeKey::new(b.aliased_type.clone())],
            Binding::ConstructorInjected(b) => b
                .factory
                .parameters
                .iter()
                .filter(|p| !p.is_assisted)
                .map(|p| p.contextual_type_key.clone())
                .chain(b.injected_members.iter().cloned())
                .collect(),
            Binding::Assisted(b) => vec![b.target.clone()],
            Binding::Multibinding(b) => b
                .source_bindings
                .iter()
                .cloned()
                .map(ContextualTypeKey::new)
                .collect(),
            Binding::MembersInjected(b) => b
                .parameters
                .iter()
                .map(|p| p.contextual_type_key.clone())
                .collect(),
            Binding::CustomWrapper(b) => vec![b.wrapped.clone()],
            Binding::BoundInstance(_)
            | Binding::ObjectClass(_)
            | Binding::GraphDependency(_)
            | Binding::GraphExtension(_)
            | Binding::GraphExtensionFactory(_)
            | Binding::Absent(_) => Vec::new(),
        }
    }

    /// Multibinding annotations, for provided and alias contributors
    pub fn contribution(&self) -> Option<&MultibindingContribution> {
        match self {
            Binding::Provided(b) => b.contribution.as_ref(),
            Binding::Alias(b) => b.contribution.as_ref(),
            _ => None,
        }
    }

    pub fn is_into_multibinding(&self) -> bool {
        self.contribution().is_some()
    }

    /// Whether the binding's dependencies are cheap enough to inline at a
    /// multibinding construction site
    ///
    /// Zero-dependency variants and variants whose single dependency is always
    /// delivered through a stored reference count as trivial.
    pub fn has_trivial_dependencies(&self) -> bool {
        match self {
            Binding::BoundInstance(_)
            | Binding::ObjectClass(_)
            | Binding::GraphDependency(_)
            | Binding::Absent(_) => true,
            Binding::Assisted(_) | Binding::Alias(_) | Binding::CustomWrapper(_) => true,
            Binding::ConstructorInjected(_) | Binding::MembersInjected(_) => {
                self.dependencies().is_empty()
            }
            Binding::Provided(b) => b.parameters.is_empty(),
            Binding::Multibinding(b) => b.source_bindings.is_empty(),
            Binding::GraphExtension(_) | Binding::GraphExtensionFactory(_) => false,
        }
    }

    /// Declared statically by the graph rather than derived on lookup
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Binding::Provided(_) | Binding::Alias(_) | Binding::MembersInjected(_)
        )
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Binding::Provided(b) => b.location.as_ref(),
            Binding::Alias(b) => b.location.as_ref(),
            Binding::ConstructorInjected(b) => b.location.as_ref(),
            Binding::Assisted(b) => b.location.as_ref(),
            Binding::Multibinding(b) => b.location.as_ref(),
            Binding::MembersInjected(b) => b.location.as_ref(),
            Binding::ObjectClass(b) => b.location.as_ref(),
            Binding::BoundInstance(_)
            | Binding::GraphDependency(_)
            | Binding::GraphExtension(_)
            | Binding::GraphExtensionFactory(_)
            | Binding::CustomWrapper(_)
            | Binding::Absent(_) => None,
        }
    }

    /// The declaration diagnostics about this binding anchor to
    pub fn declaration(&self) -> DeclarationRef {
        DeclarationRef::new(self.render_short(), self.location().cloned())
    }

    /// A short name usable as a storage or property name
    pub fn name_hint(&self) -> String {
        match self {
            Binding::Provided(b) => b.provider.name.clone(),
            Binding::Alias(b) => match &b.callable {
                Some(callable) => callable.name.clone(),
                None => type_name_hint(self.type_key()),
            },
            Binding::BoundInstance(b) => b.name_hint.clone(),
            Binding::ConstructorInjected(b) => lower_first(b.class.short_name()),
            Binding::ObjectClass(b) => lower_first(b.class.short_name()),
            Binding::Assisted(b) => lower_first(b.factory_class.short_name()),
            Binding::MembersInjected(b) => {
                format!("{}MembersInjector", lower_first(b.target_class.short_name()))
            }
            Binding::GraphDependency(b) => b.property_access.property_name.clone(),
            Binding::GraphExtension(b) | Binding::GraphExtensionFactory(b) => {
                lower_first(b.extension.short_name())
            }
            Binding::Multibinding(_)
            | Binding::CustomWrapper(_)
            | Binding::Absent(_) => type_name_hint(self.type_key()),
        }
    }

    /// Render the declaration site in the form used by dependency traces
    pub fn render_short(&self) -> String {
        match self {
            Binding::Provided(b) => b.provider.to_string(),
            Binding::Alias(b) => match &b.callable {
                Some(callable) => callable.to_string(),
                None => format!("{} (alias)", b.contextual_type_key.type_key.render(true, true)),
            },
            Binding::ConstructorInjected(b) => b.class.short_name().to_string(),
            Binding::Assisted(b) => b.factory_class.short_name().to_string(),
            Binding::MembersInjected(b) => {
                format!("{}.injectMembers", b.target_class.short_name())
            }
            Binding::ObjectClass(b) => b.class.short_name().to_string(),
            Binding::GraphDependency(b) => format!(
                "{}.{}",
                b.property_access.owner_key.render(true, false),
                b.property_access.property_name
            ),
            Binding::GraphExtension(b) | Binding::GraphExtensionFactory(b) => match &b.accessor {
                Some(accessor) => accessor.to_string(),
                None => b.extension.short_name().to_string(),
            },
            Binding::Multibinding(_)
            | Binding::BoundInstance(_)
            | Binding::CustomWrapper(_)
            | Binding::Absent(_) => self.type_key().render(true, true),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.type_key())
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn type_name_hint(key: &TypeKey) -> String {
    let mut hint = String::new();
    collect_type_name(&key.ty, &mut hint);
    lower_first(&hint)
}

fn collect_type_name(ty: &crate::types::TypeRef, out: &mut String) {
    if let Some(id) = ty.class_id() {
        out.push_str(id.short_name());
    }
    for argument in ty.arguments() {
        collect_type_name(argument, out);
    }
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;
