//! Model registry: backend lifecycle and the active pointer
//!
//! The registry owns one entry per configured descriptor and the single
//! `active` index. Entries are immutable after bootstrap publishes them in
//! a terminal state; `active` is the only mutable shared field in the hot
//! path and is read and written with single atomic operations. No lock is
//! ever held across an inference call.

use crate::descriptor::BackendDescriptor;
use crate::loader::BackendLoader;
use crate::predictor::Predictor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use toxscan_core::{BackendKind, BackendSnapshot, BackendState, BootstrapError, LoadError, SwitchError};
use tracing::{error, info, warn};

/// One backend's lifecycle record. Owned exclusively by the registry.
pub struct BackendEntry {
    descriptor: BackendDescriptor,
    state: BackendState,
    /// Present iff `state == Ready`
    predictor: Option<Arc<dyn Predictor>>,
    /// Present iff `state == Failed`
    load_error: Option<LoadError>,
}

impl BackendEntry {
    fn unloaded(descriptor: BackendDescriptor) -> Self {
        Self {
            descriptor,
            state: BackendState::Unloaded,
            predictor: None,
            load_error: None,
        }
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn snapshot(&self) -> BackendSnapshot {
        BackendSnapshot {
            name: self.descriptor.name.clone(),
            kind: self.descriptor.kind,
            labels: self.descriptor.labels.clone(),
            state: self.state,
            error: self.load_error.as_ref().map(|e| e.to_string()),
            description: self.descriptor.description.clone(),
            accuracy: self.descriptor.accuracy.clone(),
            inference_speed: self.descriptor.inference_speed.clone(),
        }
    }
}

/// The backend captured at the start of one `predict` call.
///
/// Holding the `Arc` keeps the predictor alive for the whole call; a
/// concurrent switch only repoints the active index and can never
/// invalidate this capture, because entries are immutable once Ready and
/// never removed.
pub struct ActiveBackend {
    pub name: String,
    pub kind: BackendKind,
    pub predictor: Arc<dyn Predictor>,
}

/// Registry of load-attempted backends plus the active pointer.
pub struct ModelRegistry {
    /// Entries in configuration order, immutable after bootstrap
    entries: Vec<BackendEntry>,
    index: HashMap<String, usize>,
    /// Index of the entry currently serving `predict`. Invariant: always
    /// points at a Ready entry.
    active: AtomicUsize,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("entries", &self.entries.len())
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish()
    }
}

impl ModelRegistry {
    /// Load every descriptor and build the registry.
    ///
    /// Non-default load failures are recorded and tolerated: the registry
    /// serves with whichever backends loaded. If the default backend does
    /// not end up Ready, the whole bootstrap fails and no registry is
    /// produced.
    pub fn bootstrap(
        descriptors: Vec<BackendDescriptor>,
        default: &str,
        loader: &dyn BackendLoader,
    ) -> Result<Self, BootstrapError> {
        if descriptors.is_empty() {
            return Err(BootstrapError::NoBackends);
        }

        info!("initializing model registry with {} backends", descriptors.len());

        let mut entries = Vec::with_capacity(descriptors.len());
        let mut index = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if index.contains_key(&descriptor.name) {
                return Err(BootstrapError::DuplicateBackend(descriptor.name));
            }

            let mut entry = BackendEntry::unloaded(descriptor);
            entry.state = BackendState::Loading;
            info!(backend = %entry.descriptor.name, kind = %entry.descriptor.kind, "loading backend");

            match loader.load(&entry.descriptor) {
                Ok(predictor) => {
                    entry.predictor = Some(Arc::from(predictor));
                    entry.state = BackendState::Ready;
                    info!(backend = %entry.descriptor.name, "✓ backend ready");
                }
                Err(e) => {
                    warn!(backend = %entry.descriptor.name, error = %e, "✗ backend failed to load");
                    entry.load_error = Some(e);
                    entry.state = BackendState::Failed;
                }
            }

            index.insert(entry.descriptor.name.clone(), entries.len());
            entries.push(entry);
        }

        let default_idx = *index
            .get(default)
            .ok_or_else(|| BootstrapError::UnknownDefault(default.to_string()))?;

        let default_entry = &entries[default_idx];
        if !default_entry.state.is_ready() {
            let reason = default_entry
                .load_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "backend did not reach ready state".to_string());
            error!(backend = %default, %reason, "default backend unavailable, refusing to serve");
            return Err(BootstrapError::DefaultFailed {
                name: default.to_string(),
                reason,
            });
        }

        let ready = entries.iter().filter(|e| e.state.is_ready()).count();
        info!(
            "model registry initialized with {}/{} backends ready, active: '{}'",
            ready,
            entries.len(),
            default
        );

        Ok(Self {
            entries,
            index,
            active: AtomicUsize::new(default_idx),
        })
    }

    /// Capture the active backend for one prediction.
    pub fn active(&self) -> ActiveBackend {
        let entry = &self.entries[self.active.load(Ordering::Acquire)];
        let predictor = entry
            .predictor
            .as_ref()
            .expect("active entry is always Ready");
        ActiveBackend {
            name: entry.descriptor.name.clone(),
            kind: entry.descriptor.kind,
            predictor: Arc::clone(predictor),
        }
    }

    /// Name of the backend currently serving `predict`.
    pub fn active_name(&self) -> &str {
        &self.entries[self.active.load(Ordering::Acquire)].descriptor.name
    }

    /// Repoint the active pointer to an already-Ready entry.
    ///
    /// Never loads or unloads a predictor, which is why switching is a
    /// zero-downtime, near-instant operation. Concurrent switches resolve
    /// last-writer-wins through the single atomic store.
    pub fn switch_active(&self, name: &str) -> Result<(), SwitchError> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| SwitchError::UnknownBackend(name.to_string()))?;

        let entry = &self.entries[idx];
        if !entry.state.is_ready() {
            return Err(SwitchError::NotReady {
                name: name.to_string(),
                state: entry.state,
            });
        }

        self.active.store(idx, Ordering::Release);
        Ok(())
    }

    /// Read-only snapshot of every entry, in configuration order.
    pub fn list(&self) -> Vec<BackendSnapshot> {
        self.entries.iter().map(BackendEntry::snapshot).collect()
    }

    /// Snapshot of one entry by name.
    pub fn snapshot_of(&self, name: &str) -> Option<BackendSnapshot> {
        self.index.get(name).map(|&idx| self.entries[idx].snapshot())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ready_count(&self) -> usize {
        self.entries.iter().filter(|e| e.state.is_ready()).count()
    }
}
