//! Static backend metadata

use std::path::PathBuf;
use toxscan_core::BackendKind;

/// Immutable metadata about one loadable backend, created at process
/// startup from configuration.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    /// Unique key across the descriptor set (e.g. "distilbert", "toxicity")
    pub name: String,

    /// Output contract; selects the loader and the normalizer
    pub kind: BackendKind,

    /// Filesystem path the loader uses to materialize the predictor
    pub location: PathBuf,

    /// Declared label set. For SingleLabel/Baseline this is the mutually
    /// exclusive class set; for MultiLabel the independent category names.
    pub labels: Vec<String>,

    /// Display hints for introspection/UI, not used by dispatch
    pub description: Option<String>,
    pub accuracy: Option<String>,
    pub inference_speed: Option<String>,
}

impl BackendDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: BackendKind,
        location: impl Into<PathBuf>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            location: location.into(),
            labels,
            description: None,
            accuracy: None,
            inference_speed: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_accuracy(mut self, accuracy: impl Into<String>) -> Self {
        self.accuracy = Some(accuracy.into());
        self
    }

    pub fn with_inference_speed(mut self, speed: impl Into<String>) -> Self {
        self.inference_speed = Some(speed.into());
        self
    }
}
