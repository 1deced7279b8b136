//! Registry and dispatcher behavior under concurrency and failure
//!
//! These tests drive the registry/dispatcher contract with fake loaders
//! and predictors: switch safety, zero-downtime switching against slow
//! in-flight predictions, bootstrap failure modes, and input validation.

use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use toxscan_backends::{BackendDescriptor, BackendLoader, Dispatcher, ModelRegistry, Predictor};
use toxscan_core::{BackendKind, BackendState, BootstrapError, LoadError, RawOutput, SwitchError};

/// Predictor that returns a fixed output, optionally after a delay.
struct FakePredictor {
    output: RawOutput,
    delay: Option<Duration>,
}

#[async_trait]
impl Predictor for FakePredictor {
    async fn score(&self, _text: &str) -> anyhow::Result<RawOutput> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.output.clone())
    }
}

/// Loader configured per backend name: a delay, a fixed winning label, or
/// a load failure.
#[derive(Default)]
struct FakeLoader {
    delays: HashMap<String, Duration>,
    failures: Vec<String>,
}

impl FakeLoader {
    fn failing(names: &[&str]) -> Self {
        Self {
            delays: HashMap::new(),
            failures: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }
}

impl BackendLoader for FakeLoader {
    fn load(&self, descriptor: &BackendDescriptor) -> Result<Box<dyn Predictor>, LoadError> {
        if self.failures.contains(&descriptor.name) {
            return Err(LoadError::NotFound(descriptor.location.clone()));
        }

        // The winning label encodes the backend name so tests can tell
        // which predictor actually served a request.
        let mut output = RawOutput::new();
        output.insert(format!("from_{}", descriptor.name), 0.9);
        output.insert("other".to_string(), 0.1);

        Ok(Box::new(FakePredictor {
            output,
            delay: self.delays.get(&descriptor.name).copied(),
        }))
    }
}

fn descriptor(name: &str) -> BackendDescriptor {
    BackendDescriptor::new(
        name,
        BackendKind::SingleLabel,
        format!("models/{name}"),
        vec![format!("from_{name}"), "other".to_string()],
    )
}

#[tokio::test]
async fn test_in_flight_predict_survives_concurrent_switch() {
    let loader = FakeLoader::default().with_delay("slow", Duration::from_millis(150));
    let registry = Arc::new(
        ModelRegistry::bootstrap(
            vec![descriptor("slow"), descriptor("fast")],
            "slow",
            &loader,
        )
        .unwrap(),
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));

    // Start a prediction against the slow backend, then switch away while
    // it is still in flight.
    let in_flight = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.predict("some text").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    dispatcher.switch_backend("fast").unwrap();
    assert_eq!(registry.active_name(), "fast");

    // The in-flight call completes with the backend it captured at
    // invocation time.
    let result = in_flight.await.unwrap().unwrap();
    assert_eq!(result.backend, "slow");
    assert_eq!(result.label, "from_slow");

    // New calls use the new backend.
    let result = dispatcher.predict("more text").await.unwrap();
    assert_eq!(result.backend, "fast");
    assert_eq!(result.label, "from_fast");
}

#[tokio::test]
async fn test_predict_never_mutates_registry_state() {
    let registry = Arc::new(
        ModelRegistry::bootstrap(
            vec![descriptor("a"), descriptor("b")],
            "a",
            &FakeLoader::default(),
        )
        .unwrap(),
    );
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    let before = registry.list();
    for _ in 0..10 {
        dispatcher.predict("text").await.unwrap();
    }
    let _ = dispatcher.predict("").await;

    assert_eq!(registry.list(), before);
    assert_eq!(registry.active_name(), "a");
}

#[tokio::test]
async fn test_switch_failure_does_not_affect_serving() {
    let loader = FakeLoader::failing(&["broken"]);
    let registry = Arc::new(
        ModelRegistry::bootstrap(
            vec![descriptor("a"), descriptor("broken")],
            "a",
            &loader,
        )
        .unwrap(),
    );
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    let err = dispatcher.switch_backend("broken").unwrap_err();
    assert_eq!(
        err,
        SwitchError::NotReady {
            name: "broken".to_string(),
            state: BackendState::Failed,
        }
    );

    let result = dispatcher.predict("still serving").await.unwrap();
    assert_eq!(result.backend, "a");
}

#[test]
fn test_bootstrap_fatal_without_usable_default() {
    let err = ModelRegistry::bootstrap(
        vec![descriptor("a"), descriptor("b")],
        "a",
        &FakeLoader::failing(&["a"]),
    )
    .unwrap_err();
    assert!(matches!(err, BootstrapError::DefaultFailed { .. }));
}

#[tokio::test]
async fn test_many_concurrent_predicts_and_switches() {
    let registry = Arc::new(
        ModelRegistry::bootstrap(
            vec![descriptor("a"), descriptor("b")],
            "a",
            &FakeLoader::default(),
        )
        .unwrap(),
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));

    let mut tasks = Vec::new();
    for i in 0..64 {
        let dispatcher = Arc::clone(&dispatcher);
        tasks.push(tokio::spawn(async move {
            if i % 8 == 0 {
                let target = if i % 16 == 0 { "b" } else { "a" };
                dispatcher.switch_backend(target).unwrap();
                None
            } else {
                Some(dispatcher.predict("text").await.unwrap())
            }
        }));
    }

    for task in tasks {
        if let Some(result) = task.await.unwrap() {
            // Every prediction was served by some Ready backend.
            assert!(result.backend == "a" || result.backend == "b");
            assert_eq!(result.label, format!("from_{}", result.backend));
        }
    }
}

proptest! {
    /// For any sequence of switch attempts across unknown, failed, and
    /// ready targets, the active pointer always refers to a Ready entry
    /// and only successful switches move it.
    #[test]
    fn prop_active_always_refers_to_ready_entry(
        targets in proptest::collection::vec(
            prop_oneof![
                Just("ready_a"),
                Just("ready_b"),
                Just("failed_c"),
                Just("unknown_x"),
            ],
            1..32,
        )
    ) {
        let loader = FakeLoader::failing(&["failed_c"]);
        let registry = ModelRegistry::bootstrap(
            vec![descriptor("ready_a"), descriptor("ready_b"), descriptor("failed_c")],
            "ready_a",
            &loader,
        )
        .unwrap();

        for target in targets {
            let before = registry.active_name().to_string();
            let outcome = registry.switch_active(target);

            match target {
                "ready_a" | "ready_b" => {
                    prop_assert!(outcome.is_ok());
                    prop_assert_eq!(registry.active_name(), target);
                }
                "failed_c" => {
                    let not_ready = matches!(outcome, Err(SwitchError::NotReady { .. }));
                    prop_assert!(not_ready);
                    prop_assert_eq!(registry.active_name(), before);
                }
                _ => {
                    prop_assert!(matches!(outcome, Err(SwitchError::UnknownBackend(_))));
                    prop_assert_eq!(registry.active_name(), before);
                }
            }

            let active = registry
                .snapshot_of(registry.active_name())
                .expect("active entry exists");
            prop_assert_eq!(active.state, BackendState::Ready);
        }
    }
}
