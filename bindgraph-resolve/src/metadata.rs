//! Graph metadata export
//!
//! Writes one JSON document per resolved graph for offline analysis tools.
//! The document lists the graph's roots and scopes and, for every binding,
//! its kind, scope, dependency edges, multibinding membership and planned
//! storage.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::graph::{GraphRoot, ResolvedGraph};
use crate::storage::{StorageKind, StoragePlan};
use bindgraph_core::{Binding, BindingKind, CollectionKind, ContextualTypeKey, WrappedType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subdirectory of the reports destination holding graph documents
pub const METADATA_DIR: &str = "graph-metadata";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub graph: String,
    pub scopes: Vec<String>,
    pub roots: RootsMetadata,
    pub extensions: ExtensionsMetadata,
    pub bindings: Vec<BindingMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootsMetadata {
    pub accessors: Vec<AccessorMetadata>,
    pub injectors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorMetadata {
    pub key: String,
    pub is_deferrable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionsMetadata {
    pub accessors: Vec<String>,
    pub factory_accessors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingMetadata {
    pub key: String,
    pub kind: BindingKind,
    pub scope: Option<String>,
    pub is_scoped: bool,
    pub name_hint: String,
    pub dependencies: Vec<DependencyMetadata>,
    /// Produced by the resolver rather than declared in source
    pub is_synthetic: bool,
    pub origin: Option<String>,
    pub declaration: String,
    pub multibinding: Option<MultibindingMetadata>,
    pub optional_wrapper: Option<OptionalWrapperMetadata>,
    pub alias_target: Option<String>,
    pub storage: Option<StorageKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMetadata {
    pub key: String,
    pub has_default: bool,
    pub is_deferrable: bool,
    /// Short name of the outermost wrapper, e.g. `Provider`
    pub wrapper_type: Option<String>,
    pub is_assisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultibindingMetadata {
    pub collection: CollectionKind,
    pub allow_empty: bool,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalWrapperMetadata {
    pub wrapped_type: String,
    pub wrapper: String,
}

impl GraphMetadata {
    /// Describe `graph`, with storage decisions when a plan is available
    pub fn from_graph(graph: &ResolvedGraph, plan: Option<&StoragePlan>) -> Self {
        let mut accessors = Vec::new();
        let mut injectors = Vec::new();
        for root in graph.roots() {
            match root {
                GraphRoot::Accessor(accessor) => accessors.push(AccessorMetadata {
                    key: render(&accessor.contextual_key),
                    is_deferrable: accessor.contextual_key.is_deferrable(),
                }),
                GraphRoot::Injector(injector) => injectors.push(render(&injector.contextual_key)),
            }
        }

        let mut extensions = ExtensionsMetadata {
            accessors: Vec::new(),
            factory_accessors: Vec::new(),
        };
        let mut bindings = Vec::with_capacity(graph.len());
        for (key, binding) in graph.bindings() {
            match binding.as_ref() {
                Binding::GraphExtension(_) => extensions.accessors.push(key.render(false, true)),
                Binding::GraphExtensionFactory(_) => {
                    extensions.factory_accessors.push(key.render(false, true))
                }
                _ => {}
            }
            let storage = plan.and_then(|p| p.kind_of(key));
            bindings.push(describe(binding, storage));
        }
        bindings.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            graph: graph.id().to_string(),
            scopes: graph.scopes().iter().map(|s| s.render(false)).collect(),
            roots: RootsMetadata {
                accessors,
                injectors,
            },
            extensions,
            bindings,
        }
    }
}

fn render(key: &ContextualTypeKey) -> String {
    key.render(false, true)
}

fn describe(binding: &Binding, storage: Option<StorageKind>) -> BindingMetadata {
    let assisted_target = match binding {
        Binding::Assisted(assisted) => Some(&assisted.target),
        _ => None,
    };
    let dependencies = binding
        .dependencies()
        .iter()
        .map(|dependency| DependencyMetadata {
            key: render(dependency),
            has_default: dependency.has_default,
            is_deferrable: dependency.is_deferrable(),
            wrapper_type: wrapper_type_name(&dependency.wrapped_type),
            is_assisted: assisted_target == Some(dependency),
        })
        .collect();

    let is_synthetic = match binding {
        Binding::Alias(alias) => alias.callable.is_none(),
        Binding::CustomWrapper(_) | Binding::Absent(_) => true,
        Binding::MembersInjected(members) => !members.is_from_injector_function,
        _ => false,
    };

    BindingMetadata {
        key: binding.contextual_type_key().render(false, true),
        kind: binding.kind(),
        scope: binding.scope().map(|s| s.render(false)),
        is_scoped: binding.is_scoped(),
        name_hint: binding.name_hint(),
        dependencies,
        is_synthetic,
        origin: binding.location().map(|l| l.to_string()),
        declaration: binding.render_short(),
        multibinding: match binding {
            Binding::Multibinding(multibinding) => Some(MultibindingMetadata {
                collection: multibinding.collection,
                allow_empty: multibinding.allow_empty,
                sources: multibinding
                    .source_bindings
                    .iter()
                    .map(|k| k.render(false, true))
                    .collect(),
            }),
            _ => None,
        },
        optional_wrapper: match binding {
            Binding::CustomWrapper(wrapper) => Some(OptionalWrapperMetadata {
                wrapped_type: render(&wrapper.wrapped),
                wrapper: wrapper.wrapper.to_string(),
            }),
            _ => None,
        },
        alias_target: match binding {
            Binding::Alias(alias) => Some(alias.aliased_type.render(false, true)),
            _ => None,
        },
        storage,
    }
}

fn wrapper_type_name(wrapped: &WrappedType) -> Option<String> {
    match wrapped {
        WrappedType::Canonical(_) => None,
        WrappedType::Provider { provider, .. } => Some(provider.short_name().to_string()),
        WrappedType::Lazy { lazy, .. } => Some(lazy.short_name().to_string()),
        WrappedType::Map { value, .. } => wrapper_type_name(value),
    }
}

/// File name of a graph's document, e.g. `graph-app-AppGraph.json`
pub fn metadata_file_name(graph: &ResolvedGraph) -> String {
    format!("graph-{}.json", graph.id().as_str().replace('.', "-"))
}

/// Write `graph`'s metadata under `<reports_dir>/graph-metadata/`
pub fn write_graph_metadata(
    reports_dir: &Path,
    graph: &ResolvedGraph,
    plan: Option<&StoragePlan>,
) -> Result<PathBuf> {
    let output_dir = reports_dir.join(METADATA_DIR);
    fs::create_dir_all(&output_dir).map_err(|e| ResolveError::io(&output_dir, e))?;

    let metadata = GraphMetadata::from_graph(graph, plan);
    let json = serde_json::to_string_pretty(&metadata)?;
    let path = output_dir.join(metadata_file_name(graph));
    fs::write(&path, json).map_err(|e| ResolveError::io(&path, e))?;
    debug!("Wrote graph metadata for {} to {:?}", graph.id(), path);
    Ok(path)
}

/// Write metadata when the configuration names a reports destination
pub fn export_if_configured(
    config: &ResolverConfig,
    graph: &ResolvedGraph,
    plan: Option<&StoragePlan>,
) -> Result<Option<PathBuf>> {
    match &config.reports_destination {
        Some(dir) => write_graph_metadata(dir, graph, plan).map(Some),
        None => Ok(None),
    }
}
