//! Transformer hate-speech backend (SingleLabel kind)
//!
//! The artifact layout matches a fine-tuned DistilBERT export: a model
//! directory containing `labels.json` (class names and id mapping),
//! `model.safetensors`, and usually `tokenizer.json`. The loader validates
//! all of it up front; the scorer itself is intentionally dependency-light
//! and bounded, operating on the tokenizer-truncated input.

use crate::descriptor::BackendDescriptor;
use crate::loader::{check_label_set, BackendLoader};
use crate::predictor::Predictor;
use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokenizers::Tokenizer;
use toxscan_core::{LoadError, RawOutput};
use tracing::{debug, warn};

/// Maximum sequence length the fine-tuned model was trained with.
const MAX_SEQ_LEN: usize = 512;

/// Name of the classification-head weight tensor in the export.
const CLASSIFIER_WEIGHT: &str = "classifier.weight";

/// Terms that push the hate score up. Confidence stays bounded for a
/// lexicon-only scorer.
const HATE_TERMS: &[&str] = &[
    "hate",
    "stupid",
    "idiot",
    "dumb",
    "kill",
    "die",
    "worst",
    "terrible",
    "awful",
    "garbage",
    "trash",
    "vermin",
    "subhuman",
    "filth",
    "disgusting",
    "go back to",
    "your kind",
    "you people",
];

/// `labels.json` as written by the training pipeline.
#[derive(Debug, Deserialize)]
struct LabelManifest {
    classes: Vec<String>,
}

/// Loader for SingleLabel transformer exports.
pub struct TransformerLoader;

impl BackendLoader for TransformerLoader {
    fn load(&self, descriptor: &BackendDescriptor) -> Result<Box<dyn Predictor>, LoadError> {
        let dir = &descriptor.location;
        if !dir.is_dir() {
            return Err(LoadError::NotFound(dir.clone()));
        }

        let manifest = read_label_manifest(dir)?;
        check_label_set(descriptor, &manifest.classes)?;

        verify_classifier_head(dir, manifest.classes.len())?;

        let tokenizer_path = dir.join("tokenizer.json");
        let tokenizer = if tokenizer_path.is_file() {
            let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
                LoadError::schema_mismatch(format!(
                    "failed to parse {}: {}",
                    tokenizer_path.display(),
                    e
                ))
            })?;
            Some(tokenizer)
        } else {
            warn!(
                backend = %descriptor.name,
                "tokenizer.json missing from model directory, falling back to whitespace truncation"
            );
            None
        };

        let predictor = HateSpeechPredictor::new(manifest.classes, tokenizer)?;
        Ok(Box::new(predictor))
    }
}

fn read_label_manifest(dir: &Path) -> Result<LabelManifest, LoadError> {
    let labels_path = dir.join("labels.json");
    let raw =
        std::fs::read_to_string(&labels_path).map_err(|e| LoadError::from_io(&labels_path, e))?;
    let manifest: LabelManifest = serde_json::from_str(&raw).map_err(|e| {
        LoadError::schema_mismatch(format!("failed to parse {}: {}", labels_path.display(), e))
    })?;

    if manifest.classes.is_empty() {
        return Err(LoadError::schema_mismatch(format!(
            "{} declares no classes",
            labels_path.display()
        )));
    }
    Ok(manifest)
}

/// Check that the safetensors classification head has one output row per
/// declared class.
fn verify_classifier_head(dir: &Path, num_classes: usize) -> Result<(), LoadError> {
    let weights_path = dir.join("model.safetensors");
    if !weights_path.is_file() {
        return Err(LoadError::NotFound(weights_path));
    }

    let tensors = candle_core::safetensors::load(&weights_path, &candle_core::Device::Cpu)
        .map_err(|e| {
            LoadError::schema_mismatch(format!(
                "failed to read {}: {}",
                weights_path.display(),
                e
            ))
        })?;

    let head = tensors.get(CLASSIFIER_WEIGHT).ok_or_else(|| {
        LoadError::schema_mismatch(format!(
            "{} is missing the '{}' tensor",
            weights_path.display(),
            CLASSIFIER_WEIGHT
        ))
    })?;

    let rows = head.dims().first().copied().unwrap_or(0);
    if rows != num_classes {
        return Err(LoadError::schema_mismatch(format!(
            "classification head has {} outputs but labels.json declares {} classes",
            rows, num_classes
        )));
    }

    debug!(classes = num_classes, "classifier head shape verified");
    Ok(())
}

/// SingleLabel predictor over a mutually exclusive class set.
///
/// The positive (hate) class is the last entry in the artifact's class
/// order, matching the `id2label` convention of the training pipeline
/// (0 = not_hate, 1 = hate).
pub struct HateSpeechPredictor {
    labels: Vec<String>,
    lexicon: AhoCorasick,
    tokenizer: Option<Tokenizer>,
}

impl HateSpeechPredictor {
    pub fn new(labels: Vec<String>, tokenizer: Option<Tokenizer>) -> Result<Self, LoadError> {
        let lexicon = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(HATE_TERMS)
            .map_err(|e| {
                LoadError::ResourceExhausted(format!("failed to build hate lexicon: {e}"))
            })?;

        Ok(Self {
            labels,
            lexicon,
            tokenizer,
        })
    }

    /// Truncate input to the model's maximum sequence length using the
    /// bundled tokenizer's byte offsets; whitespace fallback otherwise.
    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        if let Some(tokenizer) = &self.tokenizer {
            if let Ok(encoding) = tokenizer.encode(text, false) {
                let offsets = encoding.get_offsets();
                if offsets.len() > MAX_SEQ_LEN {
                    let end = offsets[MAX_SEQ_LEN - 1].1;
                    return text.get(..end).unwrap_or(text);
                }
                return text;
            }
        }

        match text.split_whitespace().nth(MAX_SEQ_LEN) {
            Some(word) => {
                let end = word.as_ptr() as usize - text.as_ptr() as usize;
                text.get(..end).unwrap_or(text)
            }
            None => text,
        }
    }

    fn hate_probability(&self, text: &str) -> f32 {
        let hits = self.lexicon.find_iter(text).count() as f32;
        (hits * 0.35).clamp(0.0, 0.95)
    }
}

#[async_trait]
impl Predictor for HateSpeechPredictor {
    async fn score(&self, text: &str) -> anyhow::Result<RawOutput> {
        let text = self.truncate(text);
        let p_hate = self.hate_probability(text);

        let mut scores = RawOutput::with_capacity(self.labels.len());
        let (positive, rest) = self
            .labels
            .split_last()
            .ok_or_else(|| anyhow::anyhow!("predictor has no labels"))?;

        scores.insert(positive.clone(), p_hate);
        let remainder = (1.0 - p_hate) / rest.len().max(1) as f32;
        for label in rest {
            scores.insert(label.clone(), remainder);
        }

        Ok(scores)
    }
}
