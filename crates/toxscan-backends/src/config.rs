//! YAML backend manifest
//!
//! The configuration source supplies the ordered descriptor list and the
//! name of the default-active backend. The registry consumes an
//! already-validated, in-memory descriptor list; validation happens here.

use crate::descriptor::BackendDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use toxscan_core::BackendKind;

/// Top-level backend manifest (`config/backends.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Ordered backend specifications; order is preserved through to
    /// `ModelRegistry::list`
    pub backends: Vec<BackendSpec>,

    /// Name of the backend that serves `predict` after startup. Must load
    /// successfully or startup fails.
    pub default_backend: String,
}

/// One backend specification as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    pub name: String,
    pub kind: BackendKind,
    pub path: PathBuf,
    pub labels: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub accuracy: Option<String>,

    #[serde(default)]
    pub inference_speed: Option<String>,
}

/// Manifest loading/validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl BackendsConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a manifest file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Convert to validated descriptors, preserving manifest order.
    ///
    /// Enforces the descriptor-set invariants: names unique, label sets
    /// non-empty, and the default backend present.
    pub fn to_descriptors(&self) -> Result<Vec<BackendDescriptor>, ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one backend must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(self.backends.len());

        for spec in &self.backends {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend name: '{}'",
                    spec.name
                )));
            }
            if spec.labels.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "backend '{}' declares an empty label set",
                    spec.name
                )));
            }

            let mut descriptor = BackendDescriptor::new(
                spec.name.clone(),
                spec.kind,
                spec.path.clone(),
                spec.labels.clone(),
            );
            descriptor.description = spec.description.clone();
            descriptor.accuracy = spec.accuracy.clone();
            descriptor.inference_speed = spec.inference_speed.clone();
            descriptors.push(descriptor);
        }

        if !seen.contains(self.default_backend.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "default backend '{}' is not in the backend list",
                self.default_backend
            )));
        }

        Ok(descriptors)
    }
}
