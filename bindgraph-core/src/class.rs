//! Class handles
//!
//! Classes reach the resolver as opaque handles that can be asked whether they
//! have an injectable constructor, whether they are assisted factories or
//! singleton objects, which members they inject and what their supertypes are.
//! [`ClassSource`] is that query surface; [`ClassTable`] is an in-memory
//! implementation hosts can fill from whatever front end they have.

use crate::annotation::Annotation;
use crate::declaration::{CallableId, Parameter, SourceLocation};
use crate::types::{ClassId, Substitution, TypeRef};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Shape of a class declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
    /// A singleton object declaration
    Object,
}

/// The selected injectable constructor of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassFactory {
    /// The generated factory class backing the constructor
    pub factory_class: ClassId,
    pub function: CallableId,
    pub parameters: Vec<Parameter>,
}

impl ClassFactory {
    /// Map the constructor signature onto concrete type arguments
    pub fn substitute(&self, substitution: &Substitution) -> Self {
        Self {
            factory_class: self.factory_class.clone(),
            function: self.function.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|p| p.substitute(substitution))
                .collect(),
        }
    }

    /// Whether any parameter is supplied by an assisted factory
    pub fn is_assisted(&self) -> bool {
        self.parameters.iter().any(|p| p.is_assisted)
    }
}

/// The single abstract function of an assisted-factory interface
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactoryFunction {
    pub callable: CallableId,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeRef,
}

impl FactoryFunction {
    pub fn substitute(&self, substitution: &Substitution) -> Self {
        Self {
            callable: self.callable.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|p| p.substitute(substitution))
                .collect(),
            return_type: self.return_type.substitute(substitution),
        }
    }
}

/// Everything the resolver may ask about a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: ClassId,
    pub kind: ClassKind,
    pub type_parameters: Vec<String>,
    pub scope: Option<Annotation>,
    pub is_assisted_factory: bool,
    pub constructor: Option<ClassFactory>,
    pub abstract_function: Option<FactoryFunction>,
    /// Members injected on this class itself, not including ancestors
    pub injected_members: Vec<Parameter>,
    pub supertypes: Vec<TypeRef>,
    pub location: Option<SourceLocation>,
}

impl ClassInfo {
    fn with_kind(id: impl Into<ClassId>, kind: ClassKind) -> Self {
        Self {
            id: id.into(),
            kind,
            type_parameters: Vec::new(),
            scope: None,
            is_assisted_factory: false,
            constructor: None,
            abstract_function: None,
            injected_members: Vec::new(),
            supertypes: Vec::new(),
            location: None,
        }
    }

    pub fn class(id: impl Into<ClassId>) -> Self {
        Self::with_kind(id, ClassKind::Class)
    }

    pub fn interface(id: impl Into<ClassId>) -> Self {
        Self::with_kind(id, ClassKind::Interface)
    }

    pub fn object(id: impl Into<ClassId>) -> Self {
        Self::with_kind(id, ClassKind::Object)
    }

    pub fn with_type_parameters(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.type_parameters = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn scoped(mut self, scope: Annotation) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Give the class an injectable constructor with the given parameters
    pub fn injectable(mut self, parameters: Vec<Parameter>) -> Self {
        self.constructor = Some(ClassFactory {
            factory_class: ClassId::new(format!("{}_Factory", self.id)),
            function: CallableId::new(self.id.clone(), "<init>"),
            parameters,
        });
        self
    }

    /// Mark the class as an assisted-factory interface with its abstract function
    pub fn assisted_factory(mut self, function: FactoryFunction) -> Self {
        self.kind = ClassKind::Interface;
        self.is_assisted_factory = true;
        self.abstract_function = Some(function);
        self
    }

    pub fn with_members(mut self, members: Vec<Parameter>) -> Self {
        self.injected_members = members;
        self
    }

    pub fn extends(mut self, supertype: TypeRef) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_object(&self) -> bool {
        self.kind == ClassKind::Object
    }

    /// The class type with its own type parameters as arguments
    pub fn self_type(&self) -> TypeRef {
        TypeRef::generic(
            self.id.clone(),
            self.type_parameters.iter().map(TypeRef::parameter),
        )
    }
}

/// Query surface for class handles
pub trait ClassSource: Send + Sync {
    /// Look up a class by id
    fn find_class(&self, id: &ClassId) -> Option<&ClassInfo>;

    /// The injectable constructor of a class, if it has one
    fn find_class_factory(&self, id: &ClassId) -> Option<&ClassFactory> {
        self.find_class(id)?.constructor.as_ref()
    }
}

/// In-memory class handles keyed by id
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: FxHashMap<ClassId, ClassInfo>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a class
    pub fn insert(&mut self, class: ClassInfo) {
        self.classes.insert(class.id.clone(), class);
    }

    /// Builder-style insert
    pub fn with(mut self, class: ClassInfo) -> Self {
        self.insert(class);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassSource for ClassTable {
    fn find_class(&self, id: &ClassId) -> Option<&ClassInfo> {
        self.classes.get(id)
    }
}
