//! Axum routes for the citizen registry service.

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::registry::RegistryError;
use crate::store::CitizenStore;
use crate::types::{BirthdayDistribution, Citizen, CitizenId, ImportId, TownAgeStats};

use super::middleware::{metrics_middleware, record_import_metrics};
use super::state::ServiceState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Success envelope: every 2xx body is `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    /// Response payload.
    pub data: T,
}

impl<T> DataResponse<T> {
    fn json(data: T) -> Json<Self> {
        Json(Self { data })
    }
}

/// Payload of a successful import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCreated {
    /// Id assigned to the committed import.
    pub import_id: ImportId,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Storage backend in use.
    pub backend: String,
    /// Whether the store answered its health check.
    pub store_connected: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub store: bool,
    pub details: Option<String>,
}

/// Structured error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code.
    pub code: String,
}

/// Error returned by every handler.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    /// Create an error with an explicit status.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                message: message.into(),
                code: code.into(),
            },
        }
    }

    /// Request body that is not JSON.
    pub fn malformed_json(err: serde_json::Error) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "MALFORMED_JSON", format!("Request body is not valid JSON: {}", err))
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
            RegistryError::ImportNotFound(_) | RegistryError::CitizenNotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_PATH", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.body.code, message = %self.body.message, "Request failed");
        } else {
            tracing::warn!(
                status = self.status.as_u16(),
                code = %self.body.code,
                message = %self.body.message,
                "Request rejected"
            );
        }
        (self.status, Json(self.body)).into_response()
    }
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::malformed_json)
}

type AppState<S> = State<Arc<ServiceState<S>>>;

// ============================================================================
// Route Handlers
// ============================================================================

/// Validate and commit an import batch.
async fn import_handler<S: CitizenStore + 'static>(
    State(state): AppState<S>,
    body: Bytes,
) -> Result<(StatusCode, Json<DataResponse<ImportCreated>>), ApiError> {
    let start = Instant::now();
    let payload = parse_body(&body)?;
    let import_id = state.registry.import_citizens(&payload).await?;

    let citizens = payload
        .get("citizens")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    record_import_metrics(import_id, citizens, start.elapsed().as_millis() as u64);

    Ok((StatusCode::CREATED, DataResponse::json(ImportCreated { import_id })))
}

/// Apply a partial update to one citizen.
async fn replace_handler<S: CitizenStore + 'static>(
    State(state): AppState<S>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    body: Bytes,
) -> Result<Json<DataResponse<Citizen>>, ApiError> {
    let Path((import_id, citizen_id)) = path?;
    let payload = parse_body(&body)?;
    let citizen = state
        .registry
        .replace_citizen(ImportId::new(import_id), CitizenId::new(citizen_id), &payload)
        .await?;
    Ok(DataResponse::json(citizen))
}

/// List all citizens of an import.
async fn citizens_handler<S: CitizenStore + 'static>(
    State(state): AppState<S>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<Vec<Citizen>>>, ApiError> {
    let Path(import_id) = path?;
    let citizens = state.registry.citizens(ImportId::new(import_id)).await?;
    Ok(DataResponse::json(citizens))
}

/// Presents bought per month.
async fn birthdays_handler<S: CitizenStore + 'static>(
    State(state): AppState<S>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<BirthdayDistribution>>, ApiError> {
    let Path(import_id) = path?;
    let distribution = state.registry.birthdays(ImportId::new(import_id)).await?;
    Ok(DataResponse::json(distribution))
}

/// Age percentiles per town.
async fn percentiles_handler<S: CitizenStore + 'static>(
    State(state): AppState<S>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<Vec<TownAgeStats>>>, ApiError> {
    let Path(import_id) = path?;
    let stats = state.registry.town_age_percentiles(ImportId::new(import_id)).await?;
    Ok(DataResponse::json(stats))
}

/// Health check endpoint (detailed).
async fn health_handler<S: CitizenStore + 'static>(State(state): AppState<S>) -> Json<HealthResponse> {
    let store_connected = state.store().is_healthy().await;
    Json(HealthResponse {
        status: if store_connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.backend.to_string(),
        store_connected,
    })
}

/// Liveness probe endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store is reachable, 503 otherwise.
async fn readiness_handler<S: CitizenStore + 'static>(
    State(state): AppState<S>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.store().is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some("Store connection failed".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the citizen registry service.
pub fn create_router<S: CitizenStore + 'static>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Imports
        .route("/imports", post(import_handler::<S>))
        .route(
            "/imports/:import_id/citizens/:citizen_id",
            patch(replace_handler::<S>).post(replace_handler::<S>),
        )
        .route("/imports/:import_id/citizens", get(citizens_handler::<S>))
        // Analytics
        .route("/imports/:import_id/birthdays", get(birthdays_handler::<S>))
        .route(
            "/imports/:import_id/towns/stat/percentile/age",
            get(percentiles_handler::<S>),
        )
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .with_state(state)
}
