//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use toxscan_backends::{Dispatcher, ModelRegistry};

/// State shared by every handler. Cheap to clone; everything inside is
/// reference-counted or a handle.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: PrometheusHandle,
    /// Backend names in configuration order, for stable listing.
    pub backend_order: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>, metrics: PrometheusHandle) -> Self {
        let backend_order = Arc::new(
            registry
                .list()
                .into_iter()
                .map(|snapshot| snapshot.name)
                .collect(),
        );
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
        Self {
            registry,
            dispatcher,
            metrics,
            backend_order,
        }
    }
}
