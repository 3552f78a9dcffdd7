//! Annotations carried by keys and bindings: qualifiers, scopes and map keys

use crate::types::{ClassId, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A constant annotation argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationArg {
    Str(String),
    Int(i64),
    Bool(bool),
    /// A class literal, e.g. `AppScope::class`
    Class(TypeRef),
    /// An enum entry
    Enum { class: ClassId, entry: String },
}

impl fmt::Display for AnnotationArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationArg::Str(value) => write!(f, "\"{}\"", value),
            AnnotationArg::Int(value) => write!(f, "{}", value),
            AnnotationArg::Bool(value) => write!(f, "{}", value),
            AnnotationArg::Class(ty) => write!(f, "{}::class", ty.render(true)),
            AnnotationArg::Enum { class, entry } => write!(f, "{}.{}", class.short_name(), entry),
        }
    }
}

/// An annotation instance with value equality
///
/// Two annotations are equal when their class and every argument are equal, so
/// `@Named("a")` and `@Named("b")` are distinct qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Annotation {
    pub class: ClassId,
    pub arguments: Vec<(String, AnnotationArg)>,
}

impl Annotation {
    /// An annotation without arguments
    pub fn new(class: impl Into<ClassId>) -> Self {
        Self {
            class: class.into(),
            arguments: Vec::new(),
        }
    }

    /// Add a named argument
    pub fn with_arg(mut self, name: impl Into<String>, value: AnnotationArg) -> Self {
        self.arguments.push((name.into(), value));
        self
    }

    /// Shorthand for a `@Named("...")`-style qualifier
    pub fn named(value: impl Into<String>) -> Self {
        Self::new("Named").with_arg("name", AnnotationArg::Str(value.into()))
    }

    /// Shorthand for a `@SingleIn(Scope::class)`-style scope
    pub fn single_in(scope: impl Into<ClassId>) -> Self {
        Self::new("SingleIn").with_arg("scope", AnnotationArg::Class(TypeRef::simple(scope)))
    }

    /// Look up an argument by name
    pub fn argument(&self, name: &str) -> Option<&AnnotationArg> {
        self.arguments
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value)
    }

    pub fn render(&self, short: bool) -> String {
        let name = if short {
            self.class.short_name()
        } else {
            self.class.as_str()
        };
        if self.arguments.is_empty() {
            format!("@{}", name)
        } else {
            let args: Vec<String> = self.arguments.iter().map(|(_, v)| v.to_string()).collect();
            format!("@{}({})", name, args.join(", "))
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

/// A map-key annotation on an into-map contributor together with the type of
/// the key it produces
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapKey {
    pub annotation: Annotation,
    pub key_type: TypeRef,
}

impl MapKey {
    pub fn new(annotation: Annotation, key_type: TypeRef) -> Self {
        Self {
            annotation,
            key_type,
        }
    }

    /// A `@StringKey("value")`-style key
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(
            Annotation::new("StringKey").with_arg("value", AnnotationArg::Str(value.into())),
            TypeRef::simple("String"),
        )
    }
}
