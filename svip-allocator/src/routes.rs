//! HTTP routes for the allocation service.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use svip_common::config::{AllocationConfig, Config};
use svip_common::logging::generate_trace_id;
use svip_common::{Error, Validate, ValidationError};

use crate::allocation::{Allocation, AllocationRequest, Allocator};
use crate::report::{generate_report, render_markdown, AllocationReport};

/// Shared, read-only service state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub allocator: Arc<Allocator>,
}

impl AppState {
    /// Build state from a loaded configuration; fails if it does not validate.
    pub fn new(config: Config) -> Result<Self, ValidationError> {
        let allocator = Allocator::new(config.allocation.clone())?;
        Ok(Self {
            config: Arc::new(config),
            allocator: Arc::new(allocator),
        })
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/allocate", post(allocate))
        .route("/api/v1/report", post(report))
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    pub trace_id: String,
}

impl ApiError {
    fn new(err: Error, trace_id: &str) -> Self {
        Self {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.code().to_string(),
            message: err.to_string(),
            details: err.details(),
            trace_id: trace_id.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::json!({
            "success": false,
            "error": self,
        });
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: AllocationReport,
    pub markdown: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "svip-allocator".to_string(),
    })
}

/// Active allocation configuration
pub async fn get_config(State(state): State<AppState>) -> Json<AllocationConfig> {
    Json(state.allocator.config().clone())
}

fn run(
    state: &AppState,
    body: Result<Json<AllocationRequest>, JsonRejection>,
    trace_id: &str,
) -> Result<Allocation, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!(trace_id = %trace_id, error = %rejection, "Malformed allocation request");
        ApiError::new(Error::InvalidInput(rejection.body_text()), trace_id)
    })?;

    let span = tracing::info_span!("allocate", trace_id = %trace_id, market = %request.portfolio.market);
    span.in_scope(|| {
        if let Err(err) = request.validate() {
            tracing::warn!(error = %err, "Rejected allocation request");
            return Err(ApiError::new(Error::from(err), trace_id));
        }
        Ok(state
            .allocator
            .allocate(&request.portfolio, &request.securities))
    })
}

/// Run one allocation
pub async fn allocate(
    State(state): State<AppState>,
    body: Result<Json<AllocationRequest>, JsonRejection>,
) -> Result<Json<Allocation>, ApiError> {
    let trace_id = generate_trace_id();
    run(&state, body, &trace_id).map(Json)
}

/// Run one allocation and render its report
pub async fn report(
    State(state): State<AppState>,
    body: Result<Json<AllocationRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let trace_id = generate_trace_id();
    let report = generate_report(run(&state, body, &trace_id)?);
    let markdown = render_markdown(&report);
    Ok(Json(ReportResponse { report, markdown }))
}
