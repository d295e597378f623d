//! Maintenance endpoints

use axum::{extract::State, http::StatusCode, routing::post, Router};
use snapcart_common::db;
use tracing::warn;

use crate::{ApiResult, AppState};

/// POST /admin/reset - drop all baskets and items, reseed from the catalog
pub async fn reset(State(state): State<AppState>) -> ApiResult<StatusCode> {
    warn!("Resetting database");
    db::reset_database(&state.db, &state.catalog).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/reset", post(reset))
}
