//! Per-graph resolution state shared by every component

use crate::cache::MemoCache;
use crate::config::ResolverConfig;
use crate::diagnostics::Diagnostics;
use bindgraph_core::{CallableId, ClassId, ClassSource, FrameworkSymbols, Substitution, TypeRef};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;

/// Hook for incremental-compilation bookkeeping
///
/// Called when a class derivation depends on a declaration whose signature
/// could later change.
pub trait LookupTracker: Send {
    /// `graph` looked up `class` while deriving a binding
    fn track_class_lookup(&mut self, graph: &ClassId, class: &ClassId);

    /// `graph` depends on the signature of `function`
    fn track_function_call(&mut self, graph: &ClassId, function: &CallableId);
}

/// Everything one graph's resolution reads and writes outside the registry
pub struct ResolutionContext {
    pub config: ResolverConfig,
    pub symbols: FrameworkSymbols,
    pub classes: Arc<dyn ClassSource>,
    pub diagnostics: Diagnostics,
    tracker: Option<Box<dyn LookupTracker>>,
    tracked: FxHashSet<(ClassId, ClassId)>,
    supertypes: MemoCache<TypeRef, Vec<TypeRef>>,
}

impl ResolutionContext {
    pub fn new(config: ResolverConfig, classes: Arc<dyn ClassSource>) -> Self {
        let symbols = config.symbols();
        let diagnostics = Diagnostics::new(config.max_errors);
        Self {
            config,
            symbols,
            classes,
            diagnostics,
            tracker: None,
            tracked: FxHashSet::default(),
            supertypes: MemoCache::new("supertypes"),
        }
    }

    pub fn with_tracker(mut self, tracker: Box<dyn LookupTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Record that `graph` derived a binding from `class`
    ///
    /// Repeated derivations of the same class for the same graph are not
    /// forwarded again.
    pub fn track_derivation(&mut self, graph: &ClassId, class: &ClassId, functions: &[&CallableId]) {
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        if !self.tracked.insert((class.clone(), graph.clone())) {
            return;
        }
        trace!("Tracking lookup of {} from {}", class, graph);
        tracker.track_class_lookup(graph, class);
        for function in functions {
            tracker.track_function_call(graph, function);
        }
    }

    /// All supertypes of `ty`, nearest first, with type arguments substituted
    pub fn supertype_chain(&mut self, ty: &TypeRef) -> Vec<TypeRef> {
        let classes = Arc::clone(&self.classes);
        self.supertypes
            .get_or_insert_with(ty.clone(), |ty| compute_supertypes(classes.as_ref(), ty))
            .clone()
    }

    /// `(hits, misses)` of the supertype cache
    pub fn supertype_cache_stats(&self) -> (u64, u64) {
        self.supertypes.stats()
    }
}

fn compute_supertypes(classes: &dyn ClassSource, ty: &TypeRef) -> Vec<TypeRef> {
    let mut chain = Vec::new();
    let mut seen = FxHashSet::default();
    let mut pending = vec![ty.clone()];
    while let Some(current) = pending.pop() {
        let Some(class) = current.class_id().and_then(|id| classes.find_class(id)) else {
            continue;
        };
        let substitution = Substitution::for_class(&class.type_parameters, current.arguments());
        // Reverse so the first declared supertype is visited first
        for supertype in class.supertypes.iter().rev() {
            let supertype = supertype.substitute(&substitution);
            if seen.insert(supertype.clone()) {
                pending.push(supertype);
            }
        }
        if current != *ty {
            chain.push(current);
        }
    }
    chain
}
