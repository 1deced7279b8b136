//! Linear baseline backends (Baseline kind)
//!
//! TF-IDF + LogisticRegression and TF-IDF + LinearSVC baselines, consumed
//! from a JSON export of the trained sklearn pipeline: vocabulary
//! (term -> column), coefficient vector, intercept, and the binary class
//! pair. Logistic decision values go through a sigmoid directly; the SVM
//! has no native probability output, so its decision value goes through
//! the same squashing to stay on the 0-1 scale.

use crate::descriptor::BackendDescriptor;
use crate::loader::{check_label_set, BackendLoader};
use crate::predictor::Predictor;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use toxscan_core::{LoadError, RawOutput};

/// Exported sklearn pipeline.
#[derive(Debug, Deserialize)]
struct LinearModelArtifact {
    /// "logistic" or "svm"
    model_type: String,

    /// [negative, positive] class names, in sklearn class order
    classes: Vec<String>,

    /// term -> coefficient column
    vocabulary: HashMap<String, usize>,

    coefficients: Vec<f32>,
    intercept: f32,
}

/// Loader for Baseline linear-model exports.
pub struct BaselineLoader;

impl BackendLoader for BaselineLoader {
    fn load(&self, descriptor: &BackendDescriptor) -> Result<Box<dyn Predictor>, LoadError> {
        let path = &descriptor.location;
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;

        let artifact: LinearModelArtifact = serde_json::from_str(&raw).map_err(|e| {
            LoadError::schema_mismatch(format!("failed to parse {}: {}", path.display(), e))
        })?;

        if !matches!(artifact.model_type.as_str(), "logistic" | "svm") {
            return Err(LoadError::schema_mismatch(format!(
                "unsupported model_type '{}' in {}",
                artifact.model_type,
                path.display()
            )));
        }

        if artifact.classes.len() != 2 {
            return Err(LoadError::schema_mismatch(format!(
                "baseline artifact declares {} classes, expected a binary pair",
                artifact.classes.len()
            )));
        }
        check_label_set(descriptor, &artifact.classes)?;

        if artifact.coefficients.len() != artifact.vocabulary.len() {
            return Err(LoadError::schema_mismatch(format!(
                "coefficient vector has {} entries but vocabulary has {} terms",
                artifact.coefficients.len(),
                artifact.vocabulary.len()
            )));
        }
        if let Some(bad) = artifact
            .vocabulary
            .values()
            .find(|&&idx| idx >= artifact.coefficients.len())
        {
            return Err(LoadError::schema_mismatch(format!(
                "vocabulary column {} is out of range",
                bad
            )));
        }

        Ok(Box::new(LinearPredictor { artifact }))
    }
}

/// Baseline predictor: term-frequency features, dot product, sigmoid.
pub struct LinearPredictor {
    artifact: LinearModelArtifact,
}

impl LinearPredictor {
    fn decision_value(&self, text: &str) -> f32 {
        let lowered = text.to_lowercase();
        let mut z = self.artifact.intercept;
        for token in lowered
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
        {
            if let Some(&idx) = self.artifact.vocabulary.get(token) {
                z += self.artifact.coefficients[idx];
            }
        }
        z
    }
}

#[async_trait]
impl Predictor for LinearPredictor {
    async fn score(&self, text: &str) -> anyhow::Result<RawOutput> {
        let z = self.decision_value(text);
        let p = 1.0 / (1.0 + (-z).exp());

        let mut scores = RawOutput::with_capacity(2);
        scores.insert(self.artifact.classes[1].clone(), p);
        scores.insert(self.artifact.classes[0].clone(), 1.0 - p);
        Ok(scores)
    }
}
