//! Core types for toxscan

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// The output contract a backend must satisfy.
///
/// Determines which normalizer applies to the backend's raw output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Mutually exclusive probability distribution over a fixed label set
    SingleLabel,

    /// Independent per-category probabilities, no mutual exclusivity
    MultiLabel,

    /// Classical linear model over a fixed label set (distribution output)
    Baseline,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleLabel => "single_label",
            Self::MultiLabel => "multi_label",
            Self::Baseline => "baseline",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a backend entry.
///
/// Entries start `Unloaded`, pass through `Loading` during bootstrap, and
/// end in `Ready` or `Failed` for the life of the process. A `Failed` entry
/// is never retried; a process restart is the only recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl BackendState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw backend output: label -> probability.
///
/// For `SingleLabel`/`Baseline` backends the values form a distribution
/// (summing to ~1.0); for `MultiLabel` they are independent 0-1 scores.
pub type RawOutput = HashMap<String, f32>;

/// Canonical result of one prediction, regardless of backend kind.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// Predicted label (argmax of the score map)
    pub label: String,

    /// Probability of the predicted label (0.0-1.0)
    pub confidence: f32,

    /// Full per-label score map, passed through from the backend unmodified
    pub scores: RawOutput,

    /// Name of the backend that served this prediction
    pub backend: String,

    /// Wall-clock time spent in the backend's `score` call
    pub elapsed: Duration,
}

impl PredictionResult {
    /// Scores sorted by descending probability, label as tie-break.
    pub fn sorted_scores(&self) -> Vec<(String, f32)> {
        let mut scores: Vec<(String, f32)> =
            self.scores.iter().map(|(l, s)| (l.clone(), *s)).collect();
        scores.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scores
    }
}

/// Read-only view of one registry entry, for introspection and UI display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendSnapshot {
    pub name: String,
    pub kind: BackendKind,
    pub labels: Vec<String>,
    pub state: BackendState,

    /// Load error message, present iff `state == Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_speed: Option<String>,
}
