//! Resolver configuration

use crate::error::{ResolveError, Result};
use bindgraph_core::{ClassId, FrameworkSymbols};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for resolving one compilation's graphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Abort a graph after this many user errors
    pub max_errors: usize,
    /// Drop unreachable static declarations from the registry after resolution
    pub shrink_unused_bindings: bool,
    /// Treat every declared static binding as a root
    pub full_binding_graph_validation: bool,
    /// Directory for metadata reports; export is disabled when unset
    pub reports_destination: Option<PathBuf>,
    /// Extra classes recognized as provider wrappers
    pub custom_provider_types: Vec<ClassId>,
    /// Extra classes recognized as lazy wrappers
    pub custom_lazy_types: Vec<ClassId>,
    /// Classes that form optional bindings
    pub optional_wrapper_types: Vec<ClassId>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_errors: 20,
            shrink_unused_bindings: true,
            full_binding_graph_validation: false,
            reports_destination: None,
            custom_provider_types: Vec::new(),
            custom_lazy_types: Vec::new(),
            optional_wrapper_types: vec![ClassId::new("Optional")],
        }
    }
}

impl ResolverConfig {
    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ResolveError::config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()
    }

    /// Load configuration from JSON string
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_str)
            .map_err(|e| ResolveError::config(format!("Failed to parse JSON: {}", e)))?;
        config.validate()
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ResolveError::io(path, e))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&contents),
            Some("toml") => Self::from_toml(&contents),
            other => Err(ResolveError::config(format!(
                "Unsupported config extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    fn validate(self) -> Result<Self> {
        if self.max_errors == 0 {
            return Err(ResolveError::config("max_errors must be at least 1"));
        }
        Ok(self)
    }

    /// Framework symbols with the configured wrapper types applied
    pub fn symbols(&self) -> FrameworkSymbols {
        FrameworkSymbols::default()
            .with_provider_types(self.custom_provider_types.iter().cloned())
            .with_lazy_types(self.custom_lazy_types.iter().cloned())
            .with_optional_types(self.optional_wrapper_types.iter().cloned())
    }
}
