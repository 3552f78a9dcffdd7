//! Structural type references
//!
//! The resolver never sees host-compiler types directly. Declarations arrive
//! with their types already lowered into [`TypeRef`] trees, which are cheap to
//! clone, hash and order, and which support substitution of class type
//! parameters for generic classes used at concrete type arguments.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully qualified name of a class, e.g. `app.data.UserRepository`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(String);

impl ClassId {
    /// Create a class id from a fully qualified name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The fully qualified name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment of the qualified name
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A structural type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeRef {
    /// A class type with its (possibly empty) type arguments
    Class {
        id: ClassId,
        arguments: Vec<TypeRef>,
    },
    /// A reference to a type parameter of an enclosing class
    Parameter(String),
    /// A star projection
    Star,
}

impl TypeRef {
    /// A class type without type arguments
    pub fn simple(id: impl Into<ClassId>) -> Self {
        TypeRef::Class {
            id: id.into(),
            arguments: Vec::new(),
        }
    }

    /// A class type with type arguments
    pub fn generic(id: impl Into<ClassId>, arguments: impl IntoIterator<Item = TypeRef>) -> Self {
        TypeRef::Class {
            id: id.into(),
            arguments: arguments.into_iter().collect(),
        }
    }

    /// A type parameter reference
    pub fn parameter(name: impl Into<String>) -> Self {
        TypeRef::Parameter(name.into())
    }

    /// The class id of a class type
    pub fn class_id(&self) -> Option<&ClassId> {
        match self {
            TypeRef::Class { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Type arguments of a class type, empty for anything else
    pub fn arguments(&self) -> &[TypeRef] {
        match self {
            TypeRef::Class { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// The only type argument, if there is exactly one
    pub fn single_argument(&self) -> Option<&TypeRef> {
        match self.arguments() {
            [single] => Some(single),
            _ => None,
        }
    }

    /// Whether this is a class type of the given class
    pub fn is_class(&self, id: &ClassId) -> bool {
        self.class_id() == Some(id)
    }

    /// Whether any type parameter reference remains in this type
    pub fn has_type_parameters(&self) -> bool {
        match self {
            TypeRef::Class { arguments, .. } => arguments.iter().any(TypeRef::has_type_parameters),
            TypeRef::Parameter(_) => true,
            TypeRef::Star => false,
        }
    }

    /// Replace type parameter references using `substitution`
    ///
    /// Parameters without a mapping are left untouched.
    pub fn substitute(&self, substitution: &Substitution) -> TypeRef {
        if substitution.is_empty() {
            return self.clone();
        }
        match self {
            TypeRef::Class { id, arguments } => TypeRef::Class {
                id: id.clone(),
                arguments: arguments.iter().map(|a| a.substitute(substitution)).collect(),
            },
            TypeRef::Parameter(name) => substitution
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::Star => TypeRef::Star,
        }
    }

    /// Render for diagnostics, optionally with short class names
    pub fn render(&self, short: bool) -> String {
        match self {
            TypeRef::Class { id, arguments } => {
                let name = if short { id.short_name() } else { id.as_str() };
                if arguments.is_empty() {
                    name.to_string()
                } else {
                    let args: Vec<String> = arguments.iter().map(|a| a.render(short)).collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
            TypeRef::Parameter(name) => name.clone(),
            TypeRef::Star => "*".to_string(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Mapping from type parameter names to concrete types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    mappings: FxHashMap<String, TypeRef>,
}

impl Substitution {
    /// An empty substitution
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a class's type parameters onto the arguments found at a use site
    ///
    /// Extra parameters or arguments on either side are ignored.
    pub fn for_class(type_parameters: &[String], arguments: &[TypeRef]) -> Self {
        let mappings = type_parameters
            .iter()
            .cloned()
            .zip(arguments.iter().cloned())
            .collect();
        Self { mappings }
    }

    /// Add a single mapping
    pub fn insert(&mut self, parameter: impl Into<String>, ty: TypeRef) {
        self.mappings.insert(parameter.into(), ty);
    }

    /// Look up the replacement for a parameter
    pub fn get(&self, parameter: &str) -> Option<&TypeRef> {
        self.mappings.get(parameter)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }
}
