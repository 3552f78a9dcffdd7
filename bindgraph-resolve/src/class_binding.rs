//! Bindings derived from class declarations
//!
//! When nothing in the registry or accumulator satisfies a key, its raw class
//! is inspected: an injectable constructor, an assisted-factory interface, an
//! object declaration or a members-injector request each produce their own
//! binding shape.

use crate::context::ResolutionContext;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{ResolveError, Result};
use crate::registry::BindingRegistry;
use crate::stack::BindingStack;
use bindgraph_core::{
    AbsentBinding, AssistedBinding, Binding, ClassId, ClassInfo, ConstructorInjectedBinding,
    ContextualTypeKey, CustomWrapperBinding, DeclarationRef, MembersInjectedBinding,
    ObjectClassBinding, Parameter, Substitution, TypeKey, TypeRef,
};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;

pub struct ClassBindingDeriver<'a> {
    ctx: &'a mut ResolutionContext,
    registry: &'a mut BindingRegistry,
    graph: &'a ClassId,
}

impl<'a> ClassBindingDeriver<'a> {
    pub fn new(
        ctx: &'a mut ResolutionContext,
        registry: &'a mut BindingRegistry,
        graph: &'a ClassId,
    ) -> Self {
        Self {
            ctx,
            registry,
            graph,
        }
    }

    /// Derive the bindings for `contextual_key` from its raw class
    ///
    /// An empty result means no binding could be produced.
    pub fn derive(
        &mut self,
        contextual_key: &ContextualTypeKey,
        current_bindings: &FxHashSet<TypeKey>,
        stack: &BindingStack,
    ) -> Result<Vec<Arc<Binding>>> {
        let key = &contextual_key.type_key;
        let Some(class_id) = key.ty.class_id().cloned() else {
            return Ok(self.fallback(contextual_key));
        };

        if self.ctx.symbols.is_optional(&class_id) && self.registry.is_optional(key) {
            return self.optional_binding(key, class_id).map(|b| vec![b]);
        }

        if class_id == self.ctx.symbols.members_injector {
            let target = key.ty.single_argument().ok_or_else(|| {
                ResolveError::compiler_bug(format!("{} has no target type", key))
            })?;
            let mut bindings = self.members_injector_bindings(target);
            // Injector functions declared for classes without members
            if !bindings.iter().any(|b| b.type_key() == key) {
                if let Some(declared) = self.registry.members_injector(key) {
                    bindings.push(Arc::clone(declared));
                }
            }
            return Ok(bindings
                .into_iter()
                .filter(|b| !current_bindings.contains(b.type_key()))
                .collect());
        }

        let classes = Arc::clone(&self.ctx.classes);
        let Some(class) = classes.find_class(&class_id) else {
            trace!("No class declaration for {}", key);
            return Ok(self.fallback(contextual_key));
        };

        if class.is_object() {
            self.ctx.track_derivation(self.graph, &class.id, &[]);
            // Member injection is computed for tracking only
            let _ = self.members_injector_bindings(&key.ty);
            return Ok(vec![Arc::new(Binding::ObjectClass(ObjectClassBinding {
                class: class.id.clone(),
                type_key: key.clone(),
                location: class.location.clone(),
            }))]);
        }

        if let Some(factory) = &class.constructor {
            if !class.type_parameters.is_empty() && key.ty.arguments().is_empty() {
                let message = format!(
                    "Class factory for type {} has type parameters but no type arguments provided at calling site.\n\n{}",
                    key.ty,
                    stack.render_trace()
                );
                self.ctx.diagnostics.report(
                    Diagnostic::error(DiagnosticKind::GenericClassWithoutArguments, message)
                        .at(DeclarationRef::new(class.id.to_string(), class.location.clone())),
                );
                return Ok(Vec::new());
            }

            let substitution = Substitution::for_class(&class.type_parameters, key.ty.arguments());
            let members = self.members_injector_bindings(&key.ty);
            let binding = Arc::new(Binding::ConstructorInjected(ConstructorInjectedBinding {
                class: class.id.clone(),
                type_key: key.clone(),
                scope: class.scope.clone(),
                factory: factory.substitute(&substitution),
                // The most derived injector already carries every ancestor's members
                injected_members: members
                    .last()
                    .map(|b| b.contextual_type_key())
                    .into_iter()
                    .collect(),
                location: class.location.clone(),
            }));
            self.ctx
                .track_derivation(self.graph, &factory.factory_class, &[&factory.function]);

            let mut bindings = vec![binding];
            bindings.extend(
                members
                    .into_iter()
                    .filter(|b| !current_bindings.contains(b.type_key())),
            );
            return Ok(bindings);
        }

        if class.is_assisted_factory {
            let function = class.abstract_function.as_ref().ok_or_else(|| {
                ResolveError::compiler_bug(format!(
                    "Assisted factory {} has no abstract function",
                    class.id
                ))
            })?;
            let substitution = Substitution::for_class(&class.type_parameters, key.ty.arguments());
            let function = function.substitute(&substitution);
            let target = ContextualTypeKey::provider(
                TypeKey::new(function.return_type.clone()),
                &self.ctx.symbols,
            );
            self.ctx
                .track_derivation(self.graph, &class.id, &[&function.callable]);
            return Ok(vec![Arc::new(Binding::Assisted(AssistedBinding {
                factory_class: class.id.clone(),
                type_key: key.clone(),
                function,
                target,
                location: class.location.clone(),
            }))]);
        }

        if contextual_key.has_default {
            return Ok(vec![absent(key)]);
        }

        // Computed for tracking only
        let _ = self.members_injector_bindings(&key.ty);
        Ok(Vec::new())
    }

    fn fallback(&self, contextual_key: &ContextualTypeKey) -> Vec<Arc<Binding>> {
        if contextual_key.has_default {
            vec![absent(&contextual_key.type_key)]
        } else {
            Vec::new()
        }
    }

    fn optional_binding(&self, key: &TypeKey, wrapper: ClassId) -> Result<Arc<Binding>> {
        let inner = key.ty.single_argument().ok_or_else(|| {
            ResolveError::compiler_bug(format!("Optional binding {} has no wrapped type", key))
        })?;
        let wrapped = ContextualTypeKey::new(key.with_type(inner.clone())).with_default(true);
        Ok(Arc::new(Binding::CustomWrapper(CustomWrapperBinding {
            type_key: key.clone(),
            wrapper,
            wrapped,
        })))
    }

    /// Members-injector bindings for `ty` and each of its injectable ancestors
    ///
    /// Each binding's parameters include those of every ancestor, starting
    /// from the root of the hierarchy.
    pub fn members_injector_bindings(&mut self, ty: &TypeRef) -> Vec<Arc<Binding>> {
        let classes = Arc::clone(&self.ctx.classes);
        let mut hierarchy = self.ctx.supertype_chain(ty);
        hierarchy.reverse();
        hierarchy.push(ty.clone());

        let mut merged: Vec<Parameter> = Vec::new();
        let mut bindings = Vec::new();
        for current in &hierarchy {
            let Some(class) = current.class_id().and_then(|id| classes.find_class(id)) else {
                continue;
            };
            if class.injected_members.is_empty() {
                continue;
            }
            let substitution = Substitution::for_class(&class.type_parameters, current.arguments());
            merged.extend(
                class
                    .injected_members
                    .iter()
                    .map(|p| p.substitute(&substitution)),
            );
            let key = TypeKey::new(self.ctx.symbols.members_injector_of(current.clone()));
            let binding = self.registry.members_injector_or_insert_with(key.clone(), || {
                members_injected(key, class, merged.clone())
            });
            bindings.push(binding);
        }
        bindings
    }
}

fn absent(key: &TypeKey) -> Arc<Binding> {
    Arc::new(Binding::Absent(AbsentBinding {
        type_key: key.clone(),
    }))
}

fn members_injected(key: TypeKey, class: &ClassInfo, parameters: Vec<Parameter>) -> Binding {
    Binding::MembersInjected(MembersInjectedBinding {
        type_key: key,
        target_class: class.id.clone(),
        parameters,
        is_from_injector_function: false,
        location: class.location.clone(),
    })
}

#[cfg(test)]
#[path = "class_binding_tests.rs"]
mod tests;
