//! Liveness and readiness probes

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, services::catalog::CatalogSummary, AppState};

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Healthy,
    Ready,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: ProbeStatus,
    /// Crate version of the running server
    pub version: String,
    /// Present on readiness: proves every store answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogSummary>,
}

impl HealthResponse {
    fn new(status: ProbeStatus, catalog: Option<CatalogSummary>) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            catalog,
        }
    }
}

/// Process is up
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::new(ProbeStatus::Healthy, None))
}

/// Stores reachable; answers with the current catalog figures
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 500, description = "A store did not answer")
    )
)]
pub async fn readiness_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let summary = state.services.catalog.summary().await?;
    Ok(Json(HealthResponse::new(ProbeStatus::Ready, Some(summary))))
}
