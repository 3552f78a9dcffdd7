//! Provenance shared by bindings and class handles

use crate::key::ContextualTypeKey;
use crate::types::{ClassId, Substitution};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a declaration lives in source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A function or property declared on a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallableId {
    pub owner: ClassId,
    pub name: String,
}

impl CallableId {
    pub fn new(owner: impl Into<ClassId>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner.short_name(), self.name)
    }
}

/// Handle to a source declaration, used to anchor diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationRef {
    pub name: String,
    pub location: Option<SourceLocation>,
}

impl DeclarationRef {
    pub fn new(name: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

impl fmt::Display for DeclarationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({})", self.name, location),
            None => f.write_str(&self.name),
        }
    }
}

/// An injected parameter of a constructor, provider or member injector
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub contextual_type_key: ContextualTypeKey,
    /// Supplied by the caller of an assisted factory rather than the graph
    pub is_assisted: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, contextual_type_key: ContextualTypeKey) -> Self {
        Self {
            name: name.into(),
            contextual_type_key,
            is_assisted: false,
        }
    }

    pub fn assisted(name: impl Into<String>, contextual_type_key: ContextualTypeKey) -> Self {
        Self {
            is_assisted: true,
            ..Self::new(name, contextual_type_key)
        }
    }

    pub fn substitute(&self, substitution: &Substitution) -> Self {
        Self {
            name: self.name.clone(),
            contextual_type_key: self.contextual_type_key.substitute(substitution),
            is_assisted: self.is_assisted,
        }
    }
}
