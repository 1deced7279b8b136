//! toxscan Core
//!
//! Shared types and error taxonomy for the toxscan model registry and
//! inference dispatcher.
//!
//! This crate provides:
//! - Backend kind and lifecycle-state enums
//! - The canonical prediction result shape
//! - Typed error families for loading, switching, and prediction

pub mod error;
pub mod types;

pub use error::{BootstrapError, LoadError, PredictError, SwitchError};
pub use types::{BackendKind, BackendSnapshot, BackendState, PredictionResult, RawOutput};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{BootstrapError, LoadError, PredictError, SwitchError};
    pub use crate::types::{
        BackendKind, BackendSnapshot, BackendState, PredictionResult, RawOutput,
    };
}
