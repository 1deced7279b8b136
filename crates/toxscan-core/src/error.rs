//! Error taxonomy for toxscan
//!
//! Each family has its own propagation rule:
//! - [`LoadError`] occurs only during bootstrap and is recorded on the
//!   backend entry, never surfaced to request-serving code paths.
//! - [`SwitchError`] and [`PredictError`] are returned synchronously to the
//!   caller and never cross into shared state or other requests.
//! - [`BootstrapError`] is the only fatal condition: the configured default
//!   backend could not be made ready, so no registry is produced.

use crate::types::BackendState;
use std::path::PathBuf;

/// A backend failed to load during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The descriptor's location does not exist or is unreachable
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    /// The on-disk artifact does not match the declared kind or label set
    #[error("artifact schema mismatch: {0}")]
    SchemaMismatch(String),

    /// An I/O or allocation failure while materializing the predictor
    #[error("resource exhausted while loading: {0}")]
    ResourceExhausted(String),
}

impl LoadError {
    /// Map a filesystem error for `path` into the load taxonomy.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::ResourceExhausted(format!("{}: {}", path.display(), err))
        }
    }

    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }
}

/// A request to change the active backend was rejected.
///
/// Never mutates the active pointer and never crashes the process.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SwitchError {
    #[error("unknown backend: '{0}'")]
    UnknownBackend(String),

    #[error("backend '{name}' is not ready (state: {state})")]
    NotReady { name: String, state: BackendState },
}

/// A single prediction request failed.
///
/// Recoverable per-request; registry state and other backends are
/// unaffected.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// Empty or otherwise malformed request text; rejected before any
    /// predictor runs
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend's own scoring call failed
    #[error("inference failed on backend '{backend}': {source}")]
    Inference {
        backend: String,
        source: anyhow::Error,
    },

    /// The backend produced a shape the normalizer does not accept;
    /// treated as a server fault
    #[error("normalization failed: {0}")]
    Normalization(String),
}

impl PredictError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn normalization(msg: impl Into<String>) -> Self {
        Self::Normalization(msg.into())
    }
}

/// Bootstrap could not produce a usable registry. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("default backend '{0}' is not present in the configured descriptor set")]
    UnknownDefault(String),

    #[error("default backend '{name}' failed to load: {reason}")]
    DefaultFailed { name: String, reason: String },

    #[error("duplicate backend name in descriptor set: '{0}'")]
    DuplicateBackend(String),

    #[error("descriptor set is empty")]
    NoBackends,
}
