//! Key model: what is being requested
//!
//! A [`TypeKey`] names a binding: a canonical type plus an optional qualifier.
//! A [`ContextualTypeKey`] adds the delivery shape the requester asked for
//! (plain value, provider, lazy, map of providers, ...) so that
//! `Provider<Lazy<Map<K, V>>>` and `Map<K, V>` share a binding while still
//! being distinguishable at the request site.

use crate::annotation::Annotation;
use crate::error::{CoreError, Result};
use crate::symbols::FrameworkSymbols;
use crate::types::{ClassId, Substitution, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical type and optional qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    pub ty: TypeRef,
    pub qualifier: Option<Annotation>,
}

impl TypeKey {
    /// An unqualified key
    pub fn new(ty: TypeRef) -> Self {
        Self { ty, qualifier: None }
    }

    /// A qualified key
    pub fn qualified(ty: TypeRef, qualifier: Annotation) -> Self {
        Self {
            ty,
            qualifier: Some(qualifier),
        }
    }

    /// Shorthand for an unqualified key of a class without type arguments
    pub fn simple(id: impl Into<ClassId>) -> Self {
        Self::new(TypeRef::simple(id))
    }

    /// Same qualifier, different type
    pub fn with_type(&self, ty: TypeRef) -> Self {
        Self {
            ty,
            qualifier: self.qualifier.clone(),
        }
    }

    /// Same type, different qualifier
    pub fn with_qualifier(&self, qualifier: Option<Annotation>) -> Self {
        Self {
            ty: self.ty.clone(),
            qualifier,
        }
    }

    pub fn substitute(&self, substitution: &Substitution) -> Self {
        self.with_type(self.ty.substitute(substitution))
    }

    pub fn render(&self, short: bool, include_qualifier: bool) -> String {
        match (&self.qualifier, include_qualifier) {
            (Some(qualifier), true) => format!("{} {}", qualifier.render(short), self.ty.render(short)),
            _ => self.ty.render(short),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true, true))
    }
}

/// The delivery shape of a requested type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WrappedType {
    /// The plain value
    Canonical(TypeRef),
    /// A provider of the inner shape
    Provider {
        inner: Box<WrappedType>,
        provider: ClassId,
    },
    /// A lazily computed inner shape
    Lazy {
        inner: Box<WrappedType>,
        lazy: ClassId,
    },
    /// A map whose values have their own delivery shape
    Map {
        key: TypeRef,
        value: Box<WrappedType>,
        map: ClassId,
    },
}

impl WrappedType {
    /// Analyze a declared type into its wrapping structure
    pub fn analyze(ty: &TypeRef, symbols: &FrameworkSymbols) -> WrappedType {
        if let TypeRef::Class { id, arguments } = ty {
            if *id == symbols.map && arguments.len() == 2 {
                return WrappedType::Map {
                    key: arguments[0].clone(),
                    value: Box::new(Self::analyze(&arguments[1], symbols)),
                    map: id.clone(),
                };
            }
            if let [inner] = arguments.as_slice() {
                if symbols.is_provider(id) {
                    return WrappedType::Provider {
                        inner: Box::new(Self::analyze(inner, symbols)),
                        provider: id.clone(),
                    };
                }
                if symbols.is_lazy(id) {
                    return WrappedType::Lazy {
                        inner: Box::new(Self::analyze(inner, symbols)),
                        lazy: id.clone(),
                    };
                }
            }
        }
        WrappedType::Canonical(ty.clone())
    }

    /// Unwrap down to the type the binding is keyed by
    pub fn canonical_type(&self) -> TypeRef {
        match self {
            WrappedType::Canonical(ty) => ty.clone(),
            WrappedType::Provider { inner, .. } | WrappedType::Lazy { inner, .. } => {
                inner.canonical_type()
            }
            WrappedType::Map { key, value, map } => {
                TypeRef::generic(map.clone(), [key.clone(), value.canonical_type()])
            }
        }
    }

    /// Rebuild the full requested type
    pub fn to_type(&self) -> TypeRef {
        match self {
            WrappedType::Canonical(ty) => ty.clone(),
            WrappedType::Provider { inner, provider } => {
                TypeRef::generic(provider.clone(), [inner.to_type()])
            }
            WrappedType::Lazy { inner, lazy } => TypeRef::generic(lazy.clone(), [inner.to_type()]),
            WrappedType::Map { key, value, map } => {
                TypeRef::generic(map.clone(), [key.clone(), value.to_type()])
            }
        }
    }

    /// Whether a request in this shape can be satisfied without constructing
    /// the value up front
    pub fn is_deferrable(&self) -> bool {
        match self {
            WrappedType::Canonical(_) => false,
            WrappedType::Provider { .. } | WrappedType::Lazy { .. } => true,
            WrappedType::Map { value, .. } => value.is_deferrable(),
        }
    }

    pub fn substitute(&self, substitution: &Substitution) -> WrappedType {
        match self {
            WrappedType::Canonical(ty) => WrappedType::Canonical(ty.substitute(substitution)),
            WrappedType::Provider { inner, provider } => WrappedType::Provider {
                inner: Box::new(inner.substitute(substitution)),
                provider: provider.clone(),
            },
            WrappedType::Lazy { inner, lazy } => WrappedType::Lazy {
                inner: Box::new(inner.substitute(substitution)),
                lazy: lazy.clone(),
            },
            WrappedType::Map { key, value, map } => WrappedType::Map {
                key: key.substitute(substitution),
                value: Box::new(value.substitute(substitution)),
                map: map.clone(),
            },
        }
    }

    /// Render, delegating the innermost canonical type to `canonical`
    pub fn render_with(&self, short: bool, canonical: &dyn Fn(&TypeRef) -> String) -> String {
        let name = |id: &ClassId| {
            if short {
                id.short_name().to_string()
            } else {
                id.to_string()
            }
        };
        match self {
            WrappedType::Canonical(ty) => canonical(ty),
            WrappedType::Provider { inner, provider } => {
                format!("{}<{}>", name(provider), inner.render_with(short, canonical))
            }
            WrappedType::Lazy { inner, lazy } => {
                format!("{}<{}>", name(lazy), inner.render_with(short, canonical))
            }
            WrappedType::Map { key, value, map } => format!(
                "{}<{}, {}>",
                name(map),
                key.render(short),
                value.render_with(short, &|ty: &TypeRef| ty.render(short))
            ),
        }
    }
}

/// A [`TypeKey`] plus how the requester wants it delivered
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextualTypeKey {
    pub type_key: TypeKey,
    pub wrapped_type: WrappedType,
    /// The requester declares a default value to fall back on
    pub has_default: bool,
}

impl ContextualTypeKey {
    /// A plain-value request for `type_key`
    pub fn new(type_key: TypeKey) -> Self {
        let wrapped_type = WrappedType::Canonical(type_key.ty.clone());
        Self {
            type_key,
            wrapped_type,
            has_default: false,
        }
    }

    /// Build from an explicit wrapping, checking that it unwraps to the key's type
    pub fn with_wrapping(
        type_key: TypeKey,
        wrapped_type: WrappedType,
        has_default: bool,
    ) -> Result<Self> {
        if wrapped_type.canonical_type() != type_key.ty {
            return Err(CoreError::InvariantViolation(format!(
                "wrapped type '{}' does not unwrap to key type '{}'",
                wrapped_type.to_type(),
                type_key.ty
            )));
        }
        Ok(Self {
            type_key,
            wrapped_type,
            has_default,
        })
    }

    /// Analyze a declared request type
    ///
    /// The resulting key's type is the innermost canonical type, so wrapping
    /// in providers or lazies never changes the [`TypeKey`].
    pub fn from_type(
        ty: &TypeRef,
        qualifier: Option<Annotation>,
        has_default: bool,
        symbols: &FrameworkSymbols,
    ) -> Self {
        let wrapped_type = WrappedType::analyze(ty, symbols);
        let type_key = TypeKey {
            ty: wrapped_type.canonical_type(),
            qualifier,
        };
        Self {
            type_key,
            wrapped_type,
            has_default,
        }
    }

    /// A provider-wrapped request for `type_key`
    pub fn provider(type_key: TypeKey, symbols: &FrameworkSymbols) -> Self {
        Self::new(type_key).wrap_in_provider(&symbols.provider)
    }

    /// Mark this request as having a default value
    pub fn with_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }

    /// Wrap in `provider`, replacing an outer provider of a different class
    pub fn wrap_in_provider(&self, provider: &ClassId) -> Self {
        let wrapped_type = match &self.wrapped_type {
            WrappedType::Provider {
                inner,
                provider: existing,
            } => {
                if existing == provider {
                    return self.clone();
                }
                WrappedType::Provider {
                    inner: inner.clone(),
                    provider: provider.clone(),
                }
            }
            other => WrappedType::Provider {
                inner: Box::new(other.clone()),
                provider: provider.clone(),
            },
        };
        Self {
            type_key: self.type_key.clone(),
            wrapped_type,
            has_default: self.has_default,
        }
    }

    /// Drop an outer lazy wrapper, if any
    pub fn strip_lazy(&self) -> Self {
        match &self.wrapped_type {
            WrappedType::Lazy { inner, .. } => Self {
                type_key: self.type_key.clone(),
                wrapped_type: (**inner).clone(),
                has_default: self.has_default,
            },
            _ => self.clone(),
        }
    }

    pub fn is_deferrable(&self) -> bool {
        self.wrapped_type.is_deferrable()
    }

    pub fn is_wrapped_in_provider(&self) -> bool {
        matches!(self.wrapped_type, WrappedType::Provider { .. })
    }

    pub fn is_wrapped_in_lazy(&self) -> bool {
        matches!(self.wrapped_type, WrappedType::Lazy { .. })
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self.wrapped_type, WrappedType::Canonical(_))
    }

    /// The full type the requester declared
    pub fn request_type(&self) -> TypeRef {
        self.wrapped_type.to_type()
    }

    pub fn substitute(&self, substitution: &Substitution) -> Self {
        Self {
            type_key: self.type_key.substitute(substitution),
            wrapped_type: self.wrapped_type.substitute(substitution),
            has_default: self.has_default,
        }
    }

    pub fn render(&self, short: bool, include_qualifier: bool) -> String {
        let key = &self.type_key;
        let mut rendered = self.wrapped_type.render_with(short, &|ty: &TypeRef| {
            if *ty == key.ty {
                key.render(short, include_qualifier)
            } else {
                ty.render(short)
            }
        });
        if self.has_default {
            rendered.push_str(" = ...");
        }
        rendered
    }
}

impl fmt::Display for ContextualTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false, true))
    }
}

impl From<TypeKey> for ContextualTypeKey {
    fn from(type_key: TypeKey) -> Self {
        Self::new(type_key)
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
