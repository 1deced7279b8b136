//! Predictor trait: the opaque scoring capability behind every backend

use async_trait::async_trait;
use toxscan_core::RawOutput;

/// One loadable scoring implementation.
///
/// The numeric internals (tokenization, tensor math, dot products) are
/// opaque to the registry and dispatcher; a predictor only has to turn text
/// into a label -> probability map. Calls may take milliseconds to tens of
/// milliseconds and block the calling task for their duration.
///
/// Errors are implementation-defined; the dispatcher wraps them as
/// `PredictError::Inference` without touching registry state.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Score the given text, returning labeled probabilities.
    async fn score(&self, text: &str) -> anyhow::Result<RawOutput>;
}

impl std::fmt::Debug for dyn Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Predictor")
    }
}
