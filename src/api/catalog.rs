//! Catalog home endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, services::catalog::CatalogSummary, AppState};

/// Counts of books, copies, available copies and authors
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog figures", body = CatalogSummary)
    )
)]
pub async fn get_summary(State(state): State<AppState>) -> AppResult<Json<CatalogSummary>> {
    let summary = state.services.catalog.summary().await?;
    Ok(Json(summary))
}
