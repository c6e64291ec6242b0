//! Configuration types.

use std::path::PathBuf;

/// Engine service configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address the HTTP surface binds to.
    pub bind_addr: String,
    /// Optional questionnaire catalog file; built-in defaults when absent.
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8088".to_string(),
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("DRUKCARE_BIND").unwrap_or(defaults.bind_addr),
            catalog_path: std::env::var("DRUKCARE_CATALOG").ok().map(PathBuf::from),
        }
    }
}
