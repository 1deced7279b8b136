//! toxscan Backends
//!
//! Multi-backend model registry and inference dispatcher.
//!
//! Several heterogeneous classification backends (a transformer hate-speech
//! classifier, a multi-head toxicity classifier, and two linear baselines)
//! are loaded at startup, exposed behind one prediction contract, and the
//! active backend can be swapped at runtime without restarting the service
//! or dropping in-flight requests.
//!
//! The registry is read-mostly after bootstrap: entries are immutable once
//! they reach a terminal state, and the active pointer is the only mutable
//! field in the hot path.

pub mod baseline;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod loader;
pub mod normalizer;
pub mod predictor;
pub mod registry;
pub mod toxicity;
pub mod transformer;

pub use config::{BackendSpec, BackendsConfig, ConfigError};
pub use descriptor::BackendDescriptor;
pub use dispatcher::{Dispatcher, SwitchOutcome};
pub use loader::{BackendLoader, KindLoader};
pub use normalizer::normalize;
pub use predictor::Predictor;
pub use registry::{ActiveBackend, ModelRegistry};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::BackendsConfig;
    pub use crate::descriptor::BackendDescriptor;
    pub use crate::dispatcher::{Dispatcher, SwitchOutcome};
    pub use crate::loader::{BackendLoader, KindLoader};
    pub use crate::predictor::Predictor;
    pub use crate::registry::{ActiveBackend, ModelRegistry};
    pub use toxscan_core::prelude::*;
}
