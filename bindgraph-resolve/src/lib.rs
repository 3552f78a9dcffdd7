//! Binding resolution engine for compile-time dependency graphs
//!
//! Given a graph's declarations, the engine decides which binding satisfies
//! every requested key, merges multibinding contributions, routes scoped
//! bindings through ancestor graphs, detects cycles and plans how each
//! binding is stored.
//!
//! A typical pass over one graph:
//!
//! ```ignore
//! let mut ctx = ResolutionContext::new(config, Arc::new(classes));
//! let graph = GraphResolver::new(&declaration).resolve(&mut ctx)?;
//! let plan = StoragePlanner::new(&graph).plan()?;
//! export_if_configured(&ctx.config, &graph, Some(&plan))?;
//! ```

pub mod cache;
pub mod class_binding;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod lookup;
pub mod metadata;
pub mod multibinding;
pub mod parent;
pub mod registry;
pub mod resolver;
pub mod stack;
pub mod storage;

pub use cache::MemoCache;
pub use class_binding::ClassBindingDeriver;
pub use config::ResolverConfig;
pub use context::{LookupTracker, ResolutionContext};
pub use diagnostics::{
    similar_keys, Diagnostic, DiagnosticKind, DiagnosticReporter, Diagnostics, Severity,
};
pub use error::{ResolveError, Result};
pub use graph::{
    GraphAccessor, GraphDeclaration, GraphInjector, GraphRoot, IncludedGraph, ReservedProperty,
    ResolvedGraph,
};
pub use lookup::BindingLookup;
pub use metadata::{export_if_configured, write_graph_metadata, GraphMetadata};
pub use multibinding::{
    compute_multibinding_key, contributor_key, MultibindingAccumulator, MultibindsDeclaration,
};
pub use parent::{ParentContext, ParentLevel};
pub use registry::BindingRegistry;
pub use resolver::GraphResolver;
pub use stack::{BindingStack, BindingStackEntry};
pub use storage::{PlannedStorage, StorageKind, StoragePlan, StoragePlanner};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        GraphDeclaration, GraphResolver, ParentContext, ParentLevel, ResolutionContext,
        ResolveError, ResolvedGraph, ResolverConfig, Result, StorageKind, StoragePlanner,
    };
    pub use bindgraph_core::{
        AliasBinding, Annotation, CallableId, ClassId, ClassInfo, ClassTable, ContextualTypeKey,
        Parameter, ProvidedBinding, TypeKey, TypeRef,
    };
}
