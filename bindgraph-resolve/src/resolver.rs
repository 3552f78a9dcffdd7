//! Whole-graph resolution
//!
//! [`GraphResolver`] registers a graph's declarations, walks every binding
//! reachable from its roots depth-first, and validates each one along the
//! way. User mistakes are reported to the diagnostics sink so a single pass
//! can surface many of them; the graph fails once enumeration ends with at
//! least one error, or early once the configured error limit is reached.

use crate::context::ResolutionContext;
use crate::diagnostics::{similar_keys, Diagnostic, DiagnosticKind};
use crate::error::{ResolveError, Result};
use crate::graph::{GraphDeclaration, GraphRoot, ResolvedGraph};
use crate::lookup::BindingLookup;
use crate::parent::ParentContext;
use crate::registry::BindingRegistry;
use crate::stack::{BindingStack, BindingStackEntry};
use bindgraph_core::{
    AccessKind, Binding, BoundInstanceBinding, ContextualTypeKey, DeclarationRef,
    GraphDependencyBinding, PropertyAccess, TypeKey,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, trace};

/// Name of the bound instance standing for the graph itself
const GRAPH_INSTANCE_NAME: &str = "thisGraphInstance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

pub struct GraphResolver<'a> {
    declaration: &'a GraphDeclaration,
    parent: ParentContext,
}

impl<'a> GraphResolver<'a> {
    pub fn new(declaration: &'a GraphDeclaration) -> Self {
        Self {
            declaration,
            parent: ParentContext::new(),
        }
    }

    /// Resolve as an extension of the given ancestors
    pub fn with_parent(mut self, parent: ParentContext) -> Self {
        self.parent = parent;
        self
    }

    pub fn resolve(self, ctx: &mut ResolutionContext) -> Result<ResolvedGraph> {
        let declaration = self.declaration;
        let errors_before = ctx.diagnostics.error_count();
        let mut traversal = Traversal {
            declaration,
            lookup: BindingLookup::new(declaration.id.clone(), BindingRegistry::new())
                .with_parent(self.parent.clone()),
            stack: BindingStack::new(declaration.id.clone()),
            states: FxHashMap::default(),
            bindings: BTreeMap::new(),
            current: FxHashSet::default(),
            reported_cycles: FxHashSet::default(),
            reported_missing: FxHashSet::default(),
        };

        traversal.seed_graph_bindings();
        traversal.register_declarations(ctx)?;
        traversal.inherit_bound_instances(&self.parent);

        let roots = roots_of(declaration);
        let mut requests: Vec<(ContextualTypeKey, String)> = roots
            .iter()
            .map(|root| {
                let name = match root {
                    GraphRoot::Accessor(accessor) => &accessor.name,
                    GraphRoot::Injector(injector) => &injector.name,
                };
                (
                    root.contextual_key().clone(),
                    format!("{}.{}", declaration.id.short_name(), name),
                )
            })
            .collect();
        if ctx.config.full_binding_graph_validation {
            let usage = format!("{} (full validation)", declaration.id.short_name());
            let declared = traversal
                .lookup
                .available_static_bindings()
                .into_keys()
                .chain(declaration.multibinds.iter().map(|(key, _)| key.clone()));
            for key in declared {
                requests.push((ContextualTypeKey::new(key), usage.clone()));
            }
        }

        for (request, usage) in &requests {
            traversal
                .stack
                .push(BindingStackEntry::new(request.clone(), usage.clone()));
            let visited = traversal.visit(ctx, request);
            traversal.stack.pop();
            visited?;
        }
        traversal.check_eager_cycles(ctx, &requests)?;

        let error_count = ctx.diagnostics.error_count() - errors_before;
        if error_count > 0 {
            return Err(ResolveError::ResolutionFailed {
                graph: declaration.id.to_string(),
                error_count,
            });
        }

        let (hits, misses) = ctx.supertype_cache_stats();
        debug!("Supertype cache for {}: {} hit(s), {} miss(es)", declaration.id, hits, misses);

        let pruned = if ctx.config.shrink_unused_bindings {
            traversal.shrink()
        } else {
            Vec::new()
        };
        debug!(
            "Resolved graph {} with {} binding(s), {} pruned",
            declaration.id,
            traversal.bindings.len(),
            pruned.len()
        );
        Ok(ResolvedGraph::new(declaration, traversal.bindings, roots, pruned))
    }
}

fn roots_of(declaration: &GraphDeclaration) -> Vec<GraphRoot> {
    declaration
        .accessors
        .iter()
        .cloned()
        .map(GraphRoot::Accessor)
        .chain(declaration.injectors.iter().cloned().map(GraphRoot::Injector))
        .collect()
}

struct Traversal<'a> {
    declaration: &'a GraphDeclaration,
    lookup: BindingLookup,
    stack: BindingStack,
    states: FxHashMap<TypeKey, VisitState>,
    bindings: BTreeMap<TypeKey, Arc<Binding>>,
    /// Keys of `bindings`, in the shape lookup filters against
    current: FxHashSet<TypeKey>,
    reported_cycles: FxHashSet<String>,
    /// Keys already reported missing for a request without a default
    reported_missing: FxHashSet<TypeKey>,
}

impl<'a> Traversal<'a> {
    fn insert_binding(&mut self, key: TypeKey, binding: Arc<Binding>) {
        self.current.insert(key.clone());
        self.bindings.insert(key, binding);
    }

    fn seed_graph_bindings(&mut self) {
        let declaration = self.declaration;
        self.insert_binding(
            declaration.type_key.clone(),
            Arc::new(Binding::BoundInstance(BoundInstanceBinding {
                type_key: declaration.type_key.clone(),
                name_hint: GRAPH_INSTANCE_NAME.to_string(),
                is_graph_itself: true,
            })),
        );
        for (key, name) in &declaration.bound_instances {
            self.insert_binding(
                key.clone(),
                Arc::new(Binding::BoundInstance(BoundInstanceBinding {
                    type_key: key.clone(),
                    name_hint: name.clone(),
                    is_graph_itself: false,
                })),
            );
        }
        for extension in &declaration.extensions {
            self.insert_binding(
                extension.type_key.clone(),
                Arc::new(Binding::GraphExtension(extension.clone())),
            );
        }
        for factory in &declaration.extension_factories {
            self.insert_binding(
                factory.type_key.clone(),
                Arc::new(Binding::GraphExtensionFactory(factory.clone())),
            );
        }
        for included in &declaration.included_graphs {
            for (key, accessor) in &included.accessors {
                self.insert_binding(
                    key.clone(),
                    Arc::new(Binding::GraphDependency(GraphDependencyBinding {
                        owner_key: included.graph_key.clone(),
                        graph: declaration.id.clone(),
                        property_access: PropertyAccess {
                            owner_key: included.graph_key.clone(),
                            property_name: accessor.clone(),
                            kind: AccessKind::Getter,
                        },
                        type_key: key.clone(),
                        scope: None,
                    })),
                );
            }
        }
        trace!("Seeded {} graph-level binding(s)", self.bindings.len());
    }

    fn register_declarations(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        let declaration = self.declaration;
        let statics = declaration
            .provided
            .iter()
            .cloned()
            .map(Binding::Provided)
            .chain(declaration.aliases.iter().cloned().map(Binding::Alias))
            .chain(
                declaration
                    .members_injectors
                    .iter()
                    .cloned()
                    .map(Binding::MembersInjected),
            );

        for binding in statics {
            let key = binding.type_key().clone();
            let existing = self
                .lookup
                .registry()
                .static_binding(&key)
                .or_else(|| self.lookup.registry().members_injector(&key))
                .or_else(|| self.bindings.get(&key))
                .cloned();
            if let Some(existing) = existing {
                let message = format!(
                    "[{}] {} is bound multiple times:\n    {}\n    {}",
                    declaration.id.short_name(),
                    key.render(true, true),
                    existing.render_short(),
                    binding.render_short()
                );
                let diagnostic = Diagnostic::error(DiagnosticKind::DuplicateBinding, message)
                    .at(binding.declaration());
                self.report(ctx, diagnostic)?;
                continue;
            }
            self.lookup.registry_mut().put(binding, &ctx.symbols)?;
        }

        for (key, multibinds) in &declaration.multibinds {
            self.lookup.registry_mut().register_multibinds(
                key.clone(),
                multibinds.clone(),
                &ctx.symbols,
            );
        }
        for key in &declaration.optional_keys {
            self.lookup.registry_mut().declare_optional(key.clone());
        }
        debug!(
            "Registered {} static binding(s) for {}",
            self.lookup.registry().len(),
            declaration.id
        );
        Ok(())
    }

    /// Make the ancestors' bound instances resolvable on demand
    fn inherit_bound_instances(&mut self, parent: &ParentContext) {
        let Some(direct_parent) = parent.current_parent_graph() else {
            return;
        };
        let owner_key = direct_parent.graph_key().clone();
        for level in parent.levels() {
            for key in level.bound_instances() {
                if self.current.contains(key) || self.lookup.registry().static_binding(key).is_some() {
                    continue;
                }
                let level = Arc::clone(level);
                let owner_key = owner_key.clone();
                let graph = self.declaration.id.clone();
                let type_key = key.clone();
                self.lookup.add_lazy_parent_key(key.clone(), move || {
                    let property_access = level.mark(&type_key);
                    Binding::GraphDependency(GraphDependencyBinding {
                        owner_key,
                        graph,
                        property_access,
                        type_key,
                        scope: None,
                    })
                });
            }
        }
    }

    /// Visit the top of the stack, which requested `request`
    ///
    /// Back edges are left to [`Traversal::check_eager_cycles`], which only
    /// follows eager edges.
    fn visit(&mut self, ctx: &mut ResolutionContext, request: &ContextualTypeKey) -> Result<()> {
        let key = &request.type_key;
        if self.states.contains_key(key) {
            // An absent binding only satisfies requests with a default
            let absent = matches!(
                self.bindings.get(key).map(|b| b.as_ref()),
                Some(Binding::Absent(_))
            );
            if absent && !request.has_default && self.reported_missing.insert(key.clone()) {
                return self.report_missing(ctx, request);
            }
            return Ok(());
        }
        self.states.insert(key.clone(), VisitState::InProgress);

        let binding = match self.bindings.get(key).cloned() {
            Some(binding) => binding,
            None => {
                let errors_before = ctx.diagnostics.error_count();
                let mut candidates = self
                    .lookup
                    .lookup(ctx, request, &self.current, &self.stack)?;
                if candidates.is_empty() {
                    self.states.insert(key.clone(), VisitState::Done);
                    if ctx.diagnostics.error_count() > errors_before {
                        // The deriver already explained why
                        return self.check_limit(ctx);
                    }
                    if !request.has_default {
                        self.reported_missing.insert(key.clone());
                        self.report_missing(ctx, request)?;
                    }
                    return Ok(());
                }
                let position = candidates
                    .iter()
                    .position(|b| b.type_key() == key)
                    .unwrap_or(0);
                let binding = candidates.swap_remove(position);
                for extra in candidates {
                    let extra_key = extra.type_key().clone();
                    if !self.current.contains(&extra_key) {
                        self.insert_binding(extra_key, extra);
                    }
                }
                self.insert_binding(key.clone(), Arc::clone(&binding));
                binding
            }
        };

        self.validate(ctx, &binding)?;

        let usage = binding.render_short();
        for dependency in binding.dependencies() {
            self.stack
                .push(BindingStackEntry::new(dependency.clone(), usage.clone()));
            let visited = self.visit(ctx, &dependency);
            self.stack.pop();
            visited?;
        }

        self.states.insert(key.clone(), VisitState::Done);
        Ok(())
    }

    fn validate(&mut self, ctx: &mut ResolutionContext, binding: &Binding) -> Result<()> {
        let declaration = self.declaration;
        if let Some(scope) = binding.scope() {
            let promoted = matches!(binding, Binding::GraphDependency(_));
            if !promoted && !declaration.scopes.contains(scope) {
                let graph_scopes = if declaration.scopes.is_empty() {
                    "(unscoped)".to_string()
                } else {
                    declaration
                        .scopes
                        .iter()
                        .map(|s| s.render(true))
                        .collect::<Vec<_>>()
                        .join(" ")
                };
                let message = format!(
                    "[{}] {} {} may not reference bindings from different scopes:\n    {} {}\n\n{}",
                    declaration.id.short_name(),
                    declaration.id.short_name(),
                    graph_scopes,
                    scope.render(true),
                    binding.render_short(),
                    self.stack.render_trace()
                );
                let diagnostic =
                    Diagnostic::error(DiagnosticKind::IncompatiblyScopedBindings, message)
                        .at(binding.declaration());
                self.report(ctx, diagnostic)?;
            }
        }

        if let Binding::Multibinding(multibinding) = binding {
            if multibinding.source_bindings.is_empty() && !multibinding.allow_empty {
                let message = format!(
                    "[{}] Multibinding '{}' was unexpectedly empty.\n\nIf you expect this multibinding to possibly be empty, declare it with allow_empty = true.\n\n{}",
                    declaration.id.short_name(),
                    multibinding.type_key.render(true, true),
                    self.stack.render_trace()
                );
                let diagnostic = Diagnostic::error(DiagnosticKind::EmptyMultibinding, message)
                    .at(binding.declaration());
                self.report(ctx, diagnostic)?;
            }
        }
        Ok(())
    }

    fn report_missing(
        &mut self,
        ctx: &mut ResolutionContext,
        request: &ContextualTypeKey,
    ) -> Result<()> {
        let declaration = self.declaration;
        let key = &request.type_key;
        let mut message = format!(
            "[{}] Cannot find an injectable constructor or provider for: {}\n\n{}",
            declaration.id.short_name(),
            key.render(true, true),
            self.stack.render_trace()
        );

        let statics = self.lookup.available_static_bindings();
        let multibindings = self.lookup.available_multibindings(ctx);
        let similar = similar_keys(key, statics.keys().chain(multibindings.keys()));
        if !similar.is_empty() {
            message.push_str("\n\nSimilar bindings:");
            for candidate in &similar {
                let _ = write!(message, "\n  - {}", candidate.render(true, true));
            }
        }

        let anchor = DeclarationRef::new(
            declaration.id.to_string(),
            declaration.location.clone(),
        );
        self.report(
            ctx,
            Diagnostic::error(DiagnosticKind::MissingBinding, message).at(anchor),
        )
    }

    /// Report every cycle made only of eager edges
    ///
    /// A node first reached through a deferred edge is still entered from
    /// its eager consumers here, so such cycles cannot hide behind one.
    fn check_eager_cycles(
        &mut self,
        ctx: &mut ResolutionContext,
        requests: &[(ContextualTypeKey, String)],
    ) -> Result<()> {
        let graph = self.declaration.id.short_name().to_string();
        let starts: Vec<(ContextualTypeKey, String)> = requests
            .iter()
            .cloned()
            .chain(
                self.bindings
                    .keys()
                    .map(|key| (ContextualTypeKey::new(key.clone()), graph.clone())),
            )
            .collect();

        let mut states = FxHashMap::default();
        for (request, usage) in starts {
            self.stack.push(BindingStackEntry::new(request.clone(), usage));
            let walked = self.walk_eager(ctx, &mut states, &request.type_key);
            self.stack.pop();
            walked?;
        }
        Ok(())
    }

    fn walk_eager(
        &mut self,
        ctx: &mut ResolutionContext,
        states: &mut FxHashMap<TypeKey, VisitState>,
        key: &TypeKey,
    ) -> Result<()> {
        match states.get(key) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => return self.report_cycle(ctx),
            None => {}
        }
        states.insert(key.clone(), VisitState::InProgress);

        if let Some(binding) = self.bindings.get(key).cloned() {
            let usage = binding.render_short();
            for dependency in binding.dependencies() {
                if dependency.is_deferrable() {
                    continue;
                }
                self.stack
                    .push(BindingStackEntry::new(dependency.clone(), usage.clone()));
                let walked = self.walk_eager(ctx, states, &dependency.type_key);
                self.stack.pop();
                walked?;
            }
        }

        states.insert(key.clone(), VisitState::Done);
        Ok(())
    }

    /// Report the cycle closed by the top of the stack
    fn report_cycle(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        let Some((chain, trace)) = self.stack.render_cycle() else {
            return Err(ResolveError::compiler_bug(
                "Key in progress without an earlier stack entry",
            ));
        };
        if !self.reported_cycles.insert(chain.clone()) {
            return Ok(());
        }

        let declaration = self.declaration;
        let message = format!(
            "[{}] Found a dependency cycle while processing '{}'.\nCycle:\n    {}\n\nTrace:\n{}",
            declaration.id.short_name(),
            declaration.id,
            chain,
            trace
        );
        let anchor = DeclarationRef::new(
            declaration.id.to_string(),
            declaration.location.clone(),
        );
        self.report(
            ctx,
            Diagnostic::error(DiagnosticKind::DependencyCycle, message).at(anchor),
        )
    }

    fn report(&self, ctx: &mut ResolutionContext, diagnostic: Diagnostic) -> Result<()> {
        ctx.diagnostics.report(diagnostic);
        self.check_limit(ctx)
    }

    fn check_limit(&self, ctx: &ResolutionContext) -> Result<()> {
        if ctx.diagnostics.limit_reached() {
            return Err(ResolveError::TooManyErrors {
                graph: self.declaration.id.to_string(),
                limit: ctx.diagnostics.max_errors(),
            });
        }
        Ok(())
    }

    /// Drop static declarations nothing reached
    fn shrink(&mut self) -> Vec<TypeKey> {
        let unused: Vec<TypeKey> = self
            .lookup
            .available_static_bindings()
            .into_keys()
            .filter(|key| !self.bindings.contains_key(key))
            .collect();
        for key in &unused {
            self.lookup.registry_mut().remove(key);
            trace!("Pruned unused binding {}", key);
        }
        unused
    }
}
