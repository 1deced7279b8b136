//! Request dispatch
//!
//! The single entry point the API layer calls. Translates "predict this
//! text" and "switch to backend X" into registry operations and normalizes
//! results. Every call emits one structured log record and one metric
//! sample.

use crate::normalizer::normalize;
use crate::registry::ModelRegistry;
use std::sync::Arc;
use std::time::Instant;
use toxscan_core::{PredictError, PredictionResult, SwitchError};
use tracing::{error, info, warn};

/// Outcome of a successful backend switch.
#[derive(Debug, Clone)]
pub struct SwitchOutcome {
    pub previous: String,
    pub current: String,
}

/// Request-facing dispatcher over an explicitly constructed registry.
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Classify `text` with whichever backend is active at call time.
    ///
    /// The active backend is captured exactly once, before scoring; a
    /// concurrent switch does not affect this call. Inference failures are
    /// surfaced per-request and never mark the backend Failed or switch
    /// away from it: one bad input must not take down a working backend.
    pub async fn predict(&self, text: &str) -> Result<PredictionResult, PredictError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            metrics::counter!("toxscan_errors_total", "kind" => "invalid_input").increment(1);
            return Err(PredictError::invalid_input(
                "text must not be empty or whitespace-only",
            ));
        }

        let active = self.registry.active();
        let start = Instant::now();

        let raw = match active.predictor.score(trimmed).await {
            Ok(raw) => raw,
            Err(source) => {
                warn!(backend = %active.name, error = %source, "inference failed");
                metrics::counter!("toxscan_errors_total", "kind" => "inference").increment(1);
                return Err(PredictError::Inference {
                    backend: active.name,
                    source,
                });
            }
        };
        let elapsed = start.elapsed();

        let result = normalize(active.kind, raw, &active.name, elapsed).map_err(|e| {
            error!(backend = %active.name, error = %e, "backend produced unrecognized output shape");
            metrics::counter!("toxscan_errors_total", "kind" => "normalization").increment(1);
            e
        })?;

        info!(
            backend = %result.backend,
            label = %result.label,
            confidence = result.confidence,
            latency_us = elapsed.as_micros() as u64,
            "prediction served"
        );
        metrics::counter!("toxscan_predictions_total", "backend" => result.backend.clone())
            .increment(1);
        metrics::histogram!("toxscan_inference_latency_us").record(elapsed.as_micros() as f64);

        Ok(result)
    }

    /// Repoint the active backend. Delegates to the registry; the only
    /// addition here is observability.
    pub fn switch_backend(&self, name: &str) -> Result<SwitchOutcome, SwitchError> {
        let previous = self.registry.active_name().to_string();

        if let Err(e) = self.registry.switch_active(name) {
            warn!(target_backend = %name, error = %e, "backend switch rejected");
            metrics::counter!("toxscan_errors_total", "kind" => "switch").increment(1);
            return Err(e);
        }

        info!(from = %previous, to = %name, "active backend switched");
        metrics::counter!("toxscan_switches_total").increment(1);

        Ok(SwitchOutcome {
            previous,
            current: name.to_string(),
        })
    }
}
