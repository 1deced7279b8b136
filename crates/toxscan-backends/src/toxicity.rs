//! Multi-head toxicity backend (MultiLabel kind)
//!
//! One independent binary head per toxicity category (the Jigsaw set:
//! toxic, severe_toxic, obscene, threat, insult, identity_hate). The
//! artifact is a JSON head manifest exported from the trained model:
//! per-category term weights plus a bias. Each head scores
//! sigmoid(bias + sum of matched term weights), so category probabilities
//! are independent and carry no sum constraint.

use crate::descriptor::BackendDescriptor;
use crate::loader::{check_label_set, BackendLoader};
use crate::predictor::Predictor;
use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use toxscan_core::{LoadError, RawOutput};

/// Head manifest as exported by the training pipeline.
#[derive(Debug, Deserialize)]
struct HeadManifest {
    heads: BTreeMap<String, HeadSpec>,
}

#[derive(Debug, Deserialize)]
struct HeadSpec {
    /// term -> weight contribution to the head's decision value
    terms: BTreeMap<String, f32>,
    bias: f32,
}

/// Loader for MultiLabel head manifests.
pub struct ToxicityLoader;

impl BackendLoader for ToxicityLoader {
    fn load(&self, descriptor: &BackendDescriptor) -> Result<Box<dyn Predictor>, LoadError> {
        let path = &descriptor.location;
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;

        let manifest: HeadManifest = serde_json::from_str(&raw).map_err(|e| {
            LoadError::schema_mismatch(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let found: Vec<String> = manifest.heads.keys().cloned().collect();
        check_label_set(descriptor, &found)?;

        let mut heads = Vec::with_capacity(manifest.heads.len());
        for (name, spec) in manifest.heads {
            heads.push(Head::new(name, spec)?);
        }

        Ok(Box::new(ToxicityPredictor { heads }))
    }
}

struct Head {
    name: String,
    matcher: AhoCorasick,
    /// Weight per matcher pattern, aligned by pattern index
    weights: Vec<f32>,
    bias: f32,
}

impl Head {
    fn new(name: String, spec: HeadSpec) -> Result<Self, LoadError> {
        let (terms, weights): (Vec<String>, Vec<f32>) = spec.terms.into_iter().unzip();

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&terms)
            .map_err(|e| {
                LoadError::ResourceExhausted(format!(
                    "failed to build matcher for head '{name}': {e}"
                ))
            })?;

        Ok(Self {
            name,
            matcher,
            weights,
            bias: spec.bias,
        })
    }

    fn score(&self, text: &str) -> f32 {
        let z: f32 = self
            .matcher
            .find_iter(text)
            .map(|m| self.weights[m.pattern().as_usize()])
            .sum::<f32>()
            + self.bias;
        sigmoid(z)
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// MultiLabel predictor: every head scores independently.
pub struct ToxicityPredictor {
    heads: Vec<Head>,
}

#[async_trait]
impl Predictor for ToxicityPredictor {
    async fn score(&self, text: &str) -> anyhow::Result<RawOutput> {
        let mut scores = RawOutput::with_capacity(self.heads.len());
        for head in &self.heads {
            scores.insert(head.name.clone(), head.score(text));
        }
        Ok(scores)
    }
}
