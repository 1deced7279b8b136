//! Backend loading
//!
//! One loader implementation per backend kind. A loader turns a descriptor
//! into a live predictor or a typed failure, with no partial side effects
//! visible to the registry until the outcome is final. Loaders never retry;
//! a failed backend stays failed for the life of the process.

use crate::baseline::BaselineLoader;
use crate::descriptor::BackendDescriptor;
use crate::predictor::Predictor;
use crate::toxicity::ToxicityLoader;
use crate::transformer::TransformerLoader;
use toxscan_core::{BackendKind, LoadError};

/// Turns a descriptor into a ready predictor or a typed error.
pub trait BackendLoader: Send + Sync {
    fn load(&self, descriptor: &BackendDescriptor) -> Result<Box<dyn Predictor>, LoadError>;
}

/// Default loader: dispatches to the per-kind implementation.
pub struct KindLoader;

impl BackendLoader for KindLoader {
    fn load(&self, descriptor: &BackendDescriptor) -> Result<Box<dyn Predictor>, LoadError> {
        match descriptor.kind {
            BackendKind::SingleLabel => TransformerLoader.load(descriptor),
            BackendKind::MultiLabel => ToxicityLoader.load(descriptor),
            BackendKind::Baseline => BaselineLoader.load(descriptor),
        }
    }
}

/// Compare a declared label set against what an artifact reports.
///
/// Order-insensitive: the artifact is authoritative for ordering, the
/// descriptor for membership.
pub(crate) fn check_label_set(
    descriptor: &BackendDescriptor,
    found: &[String],
) -> Result<(), LoadError> {
    let declared: std::collections::BTreeSet<&str> =
        descriptor.labels.iter().map(String::as_str).collect();
    let present: std::collections::BTreeSet<&str> = found.iter().map(String::as_str).collect();

    if declared != present {
        return Err(LoadError::schema_mismatch(format!(
            "backend '{}' declares labels {:?} but artifact contains {:?}",
            descriptor.name, descriptor.labels, found
        )));
    }
    Ok(())
}
