//! Key model and binding taxonomy for compile-time dependency graphs
//!
//! This crate holds the immutable vocabulary the resolver works in:
//! - structural types and generic substitution
//! - annotations used as qualifiers, scopes and map keys
//! - type keys and their contextual (wrapped) forms
//! - the closed set of binding variants
//! - class handles queried during derivation

pub mod annotation;
pub mod binding;
pub mod class;
pub mod declaration;
pub mod error;
pub mod key;
pub mod symbols;
pub mod types;

pub use annotation::{Annotation, AnnotationArg, MapKey};
pub use binding::{
    AbsentBinding, AccessKind, AliasBinding, AssistedBinding, Binding, BindingKind,
    BoundInstanceBinding, CollectionKind, ConstructorInjectedBinding, ContributionKind,
    CustomWrapperBinding, GraphDependencyBinding, GraphExtensionBinding, MembersInjectedBinding,
    MultibindingBinding, MultibindingContribution, ObjectClassBinding, PropertyAccess,
    ProvidedBinding,
};
pub use class::{ClassFactory, ClassInfo, ClassKind, ClassSource, ClassTable, FactoryFunction};
pub use declaration::{CallableId, DeclarationRef, Parameter, SourceLocation};
pub use error::{CoreError, Result};
pub use key::{ContextualTypeKey, TypeKey, WrappedType};
pub use symbols::FrameworkSymbols;
pub use types::{ClassId, Substitution, TypeRef};
