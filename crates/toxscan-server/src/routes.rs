//! HTTP routes and handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tower_http::cors::CorsLayer;
use toxscan_core::{BackendKind, BackendState, PredictError, SwitchError};
use tracing::info;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/models", get(list_models))
        .route("/models/switch", post(switch_model))
        .route("/predict", post(predict))
        .fallback(fallback)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct ClassScore {
    label: String,
    score: f32,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    predicted_label: String,
    confidence: f32,
    /// Per-class scores, highest first
    scores: Vec<ClassScore>,
    inference_time_ms: f64,
    model: String,
}

async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, AppError> {
    let result = state.dispatcher.predict(&req.text).await?;

    let scores = result
        .sorted_scores()
        .into_iter()
        .map(|(label, score)| ClassScore { label, score })
        .collect();

    Ok(Json(PredictResponse {
        predicted_label: result.label,
        confidence: result.confidence,
        scores,
        inference_time_ms: result.elapsed.as_secs_f64() * 1000.0,
        model: result.backend,
    }))
}

#[derive(Debug, Deserialize)]
struct SwitchRequest {
    model_name: String,
}

#[derive(Debug, Serialize)]
struct SwitchResponse {
    message: String,
    previous_model: String,
    current_model: String,
}

async fn switch_model(
    State(state): State<AppState>,
    Json(req): Json<SwitchRequest>,
) -> Result<Json<SwitchResponse>, AppError> {
    let outcome = state.dispatcher.switch_backend(&req.model_name)?;

    Ok(Json(SwitchResponse {
        message: format!("switched to model '{}'", outcome.current),
        previous_model: outcome.previous,
        current_model: outcome.current,
    }))
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    #[serde(rename = "type")]
    kind: BackendKind,
    labels: Vec<String>,
    state: BackendState,
    is_current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inference_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    current_model: String,
    available_models: Vec<String>,
    models: BTreeMap<String, ModelInfo>,
}

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let current = state.registry.active_name().to_string();

    let models = state
        .registry
        .list()
        .into_iter()
        .map(|snapshot| {
            let is_current = snapshot.name == current;
            (
                snapshot.name,
                ModelInfo {
                    kind: snapshot.kind,
                    labels: snapshot.labels,
                    state: snapshot.state,
                    is_current,
                    description: snapshot.description,
                    accuracy: snapshot.accuracy,
                    inference_speed: snapshot.inference_speed,
                    error: snapshot.error,
                },
            )
        })
        .collect();

    Json(ModelsResponse {
        current_model: current,
        available_models: state.backend_order.as_ref().clone(),
        models,
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    current_model: String,
    available_models: Vec<String>,
    num_classes: usize,
    classes: Vec<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let current = state.registry.active_name().to_string();
    let classes = state
        .registry
        .snapshot_of(&current)
        .map(|s| s.labels)
        .unwrap_or_default();

    Json(HealthResponse {
        status: "healthy",
        model_loaded: true,
        current_model: current,
        available_models: state.backend_order.as_ref().clone(),
        num_classes: classes.len(),
        classes,
    })
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn fallback() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "kind": "not_found", "message": "no such route" } })),
    )
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    Predict(PredictError),
    Switch(SwitchError),
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        AppError::Predict(err)
    }
}

impl From<SwitchError> for AppError {
    fn from(err: SwitchError) -> Self {
        AppError::Switch(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            AppError::Predict(PredictError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "invalid_input", msg.clone())
            }
            AppError::Predict(err @ PredictError::Inference { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "inference",
                err.to_string(),
            ),
            AppError::Predict(err @ PredictError::Normalization(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "normalization",
                err.to_string(),
            ),
            AppError::Switch(err @ SwitchError::UnknownBackend(_)) => {
                (StatusCode::BAD_REQUEST, "unknown_model", err.to_string())
            }
            AppError::Switch(err @ SwitchError::NotReady { .. }) => {
                (StatusCode::BAD_REQUEST, "model_not_ready", err.to_string())
            }
        };

        info!(%status, kind, "request failed: {message}");

        let body = json!({
            "error": {
                "kind": kind,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use tower::ServiceExt;
    use toxscan_backends::{BackendDescriptor, BackendLoader, ModelRegistry, Predictor};
    use toxscan_core::{LoadError, RawOutput};

    struct FakePredictor {
        fail: bool,
    }

    #[async_trait]
    impl Predictor for FakePredictor {
        async fn score(&self, _text: &str) -> anyhow::Result<RawOutput> {
            if self.fail {
                anyhow::bail!("scorer exploded");
            }
            let mut out = RawOutput::new();
            out.insert("hate".to_string(), 0.82);
            out.insert("not_hate".to_string(), 0.18);
            Ok(out)
        }
    }

    /// Loads everything; backends named "flaky" get a failing predictor,
    /// backends named "missing" fail to load.
    struct FakeLoader;

    impl BackendLoader for FakeLoader {
        fn load(
            &self,
            descriptor: &BackendDescriptor,
        ) -> Result<Box<dyn Predictor>, LoadError> {
            if descriptor.name == "missing" {
                return Err(LoadError::NotFound(descriptor.location.clone()));
            }
            Ok(Box::new(FakePredictor {
                fail: descriptor.name == "flaky",
            }))
        }
    }

    fn descriptor(name: &str) -> BackendDescriptor {
        BackendDescriptor::new(
            name,
            BackendKind::SingleLabel,
            format!("models/{name}"),
            vec!["not_hate".to_string(), "hate".to_string()],
        )
        .with_accuracy("~92% on eval set")
    }

    fn test_app() -> Router {
        let registry = ModelRegistry::bootstrap(
            vec![
                descriptor("distilbert"),
                descriptor("flaky"),
                descriptor("missing"),
            ],
            "distilbert",
            &FakeLoader,
        )
        .unwrap();
        let handle = PrometheusBuilder::new().build_recorder().handle();
        create_router(AppState::new(Arc::new(registry), handle))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_predict_returns_sorted_scores() {
        let app = test_app();

        let response = app
            .oneshot(post_json("/predict", json!({ "text": "some text" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["predicted_label"], "hate");
        assert_eq!(body["model"], "distilbert");
        assert_eq!(body["scores"][0]["label"], "hate");
        assert_eq!(body["scores"][1]["label"], "not_hate");
        assert!(body["inference_time_ms"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_predict_empty_text_is_400() {
        let app = test_app();

        let response = app
            .oneshot(post_json("/predict", json!({ "text": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_predict_inference_failure_is_500() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(post_json("/models/switch", json!({ "model_name": "flaky" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post_json("/predict", json!({ "text": "boom" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert_eq!(body["error"]["kind"], "inference");
    }

    #[tokio::test]
    async fn test_switch_reports_previous_and_current() {
        let app = test_app();

        let response = app
            .oneshot(post_json("/models/switch", json!({ "model_name": "flaky" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["previous_model"], "distilbert");
        assert_eq!(body["current_model"], "flaky");
    }

    #[tokio::test]
    async fn test_switch_to_unknown_model_is_400() {
        let app = test_app();

        let response = app
            .oneshot(post_json("/models/switch", json!({ "model_name": "nope" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["kind"], "unknown_model");
    }

    #[tokio::test]
    async fn test_switch_to_failed_model_is_400() {
        let app = test_app();

        let response = app
            .oneshot(post_json(
                "/models/switch",
                json!({ "model_name": "missing" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["kind"], "model_not_ready");
    }

    #[tokio::test]
    async fn test_models_listing_shows_state_and_current() {
        let app = test_app();

        let response = app
            .oneshot(Request::get("/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["current_model"], "distilbert");
        assert_eq!(
            body["available_models"],
            json!(["distilbert", "flaky", "missing"])
        );
        assert_eq!(body["models"]["distilbert"]["is_current"], true);
        assert_eq!(body["models"]["distilbert"]["state"], "ready");
        assert_eq!(body["models"]["missing"]["state"], "failed");
        assert!(body["models"]["missing"]["error"].is_string());
        assert_eq!(body["models"]["flaky"]["is_current"], false);
    }

    #[tokio::test]
    async fn test_health_reflects_active_model() {
        let app = test_app();

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["current_model"], "distilbert");
        assert_eq!(body["num_classes"], 2);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_app();

        let response = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
