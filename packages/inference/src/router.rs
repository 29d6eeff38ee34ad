//! Axum routes for the classification service
//!
//! Every outcome of `/predict`, including malformed uploads, is answered with
//! HTTP 200 and a JSON payload; failures carry an `error` field instead of a
//! transport-level status.

use crate::config::InferenceConfig;
use crate::error::InferenceError;
use crate::model::ModelStatus;
use crate::openapi::{ApiDoc, DOCS_PATH, OPENAPI_JSON_PATH};
use crate::predict::Predictor;
use crate::types::PredictionResponse;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Multipart field carrying the scan
pub const UPLOAD_FIELD: &str = "file";

/// Shared service state
#[derive(Clone)]
pub struct InferenceState {
    pub predictor: Arc<Predictor>,
}

impl InferenceState {
    pub fn new(predictor: Predictor) -> Self {
        Self {
            predictor: Arc::new(predictor),
        }
    }

    pub fn from_config(config: InferenceConfig) -> Self {
        Self::new(Predictor::new(config))
    }
}

/// Root status response
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
    /// `loaded` once the model is ready, `lazy_loading` before that
    pub model_status: String,
    pub model_state: ModelStatus,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Endpoints {
    pub predict: String,
    pub health: String,
    pub docs: String,
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Multipart form accepted by `/predict`
#[derive(ToSchema)]
pub struct PredictUpload {
    /// MRI scan (.jpg, .jpeg, .png, .dcm, .nii)
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Construct the router with all endpoints, including the Swagger UI
pub fn inference_router(state: InferenceState) -> Router {
    let body_limit = state.predictor.config().max_upload_bytes;
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
        .merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "status",
    responses(
        (status = 200, description = "Service is running", body = StatusResponse)
    )
)]
#[tracing::instrument(name = "GET /", skip(state))]
pub(crate) async fn root(State(state): State<Arc<InferenceState>>) -> Json<StatusResponse> {
    let model_state = state.predictor.model().state();
    let model_status = if model_state == ModelStatus::Ready {
        "loaded"
    } else {
        "lazy_loading"
    };
    Json(StatusResponse {
        message: "MRI Disease Prediction API is running".to_string(),
        model_status: model_status.to_string(),
        model_state,
        endpoints: Endpoints {
            predict: "/predict - Upload MRI image for analysis".to_string(),
            health: "/health - Service health check".to_string(),
            docs: format!("{} - API documentation", DOCS_PATH),
        },
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub(crate) async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "arogya-inference".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

struct Upload {
    filename: Option<String>,
    bytes: Bytes,
}

/// Classify an uploaded scan
///
/// POST /predict (multipart, field `file`)
#[utoipa::path(
    post,
    path = "/predict",
    tag = "prediction",
    request_body(content = PredictUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Classification, rejection or failure payload", body = PredictionResponse)
    )
)]
#[tracing::instrument(name = "POST /predict", skip_all)]
pub(crate) async fn predict(
    State(state): State<Arc<InferenceState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<PredictionResponse> {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::error!(error = %e, "Could not read upload");
            return Json(PredictionResponse::prediction_failed(e));
        }
    };

    // Decoding and inference are CPU bound
    let predictor = state.predictor.clone();
    let response = tokio::task::spawn_blocking(move || {
        predictor.handle_request(&upload.bytes, upload.filename.as_deref())
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Inference task join error");
        PredictionResponse::prediction_failed(e)
    });

    Json(response)
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Upload, InferenceError> {
    let mut multipart =
        multipart.map_err(|e| InferenceError::Unexpected(format!("invalid multipart body: {}", e)))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InferenceError::Unexpected(format!("failed to read upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| InferenceError::Unexpected(format!("failed to read upload: {}", e)))?;
        return Ok(Upload { filename, bytes });
    }

    Err(InferenceError::Unexpected(format!(
        "missing '{}' field in upload",
        UPLOAD_FIELD
    )))
}
