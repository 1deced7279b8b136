//! Response normalization
//!
//! Maps each backend kind's raw output into the one canonical
//! `PredictionResult` shape. Kind dispatch happens exactly once, here,
//! rather than scattering kind checks through the dispatcher.

use std::time::Duration;
use toxscan_core::{BackendKind, PredictError, PredictionResult, RawOutput};

/// Normalize a backend's raw score map.
///
/// - SingleLabel/Baseline: the map is a mutually exclusive distribution;
///   the argmax label wins and the map is passed through without
///   renormalization, even when its floating-point sum is not exactly 1.0
///   (renormalizing would silently mask a backend bug).
/// - MultiLabel: the map holds independent per-category probabilities; the
///   highest category is reported as the display label and the full map is
///   passed through unthresholded, so consumers can apply their own
///   per-category cutoff.
///
/// Malformed output (empty map, non-finite scores) fails closed with a
/// `Normalization` error instead of guessing a shape.
pub fn normalize(
    kind: BackendKind,
    raw: RawOutput,
    backend: &str,
    elapsed: Duration,
) -> Result<PredictionResult, PredictError> {
    if raw.is_empty() {
        return Err(PredictError::normalization(format!(
            "backend '{backend}' produced an empty score map"
        )));
    }
    if let Some((label, score)) = raw.iter().find(|(_, s)| !s.is_finite()) {
        return Err(PredictError::normalization(format!(
            "backend '{backend}' produced a non-finite score for '{label}': {score}"
        )));
    }

    let (label, confidence) = argmax(&raw);

    match kind {
        BackendKind::SingleLabel | BackendKind::Baseline => Ok(PredictionResult {
            label,
            confidence,
            scores: raw,
            backend: backend.to_string(),
            elapsed,
        }),
        BackendKind::MultiLabel => Ok(PredictionResult {
            label,
            confidence,
            scores: raw,
            backend: backend.to_string(),
            elapsed,
        }),
    }
}

/// Highest-scoring label; lexicographic tie-break keeps the result
/// deterministic across map iteration orders.
fn argmax(raw: &RawOutput) -> (String, f32) {
    let mut best_label = "";
    let mut best_score = f32::NEG_INFINITY;
    for (label, &score) in raw {
        if score > best_score || (score == best_score && label.as_str() < best_label) {
            best_label = label;
            best_score = score;
        }
    }
    (best_label.to_string(), best_score)
}
