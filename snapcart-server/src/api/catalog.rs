//! Read-only catalog endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use snapcart_common::CatalogItem;

use crate::{ApiError, ApiResult, AppState};

/// GET /catalog - every recognizable item with its keywords
pub async fn list_catalog(State(state): State<AppState>) -> Json<Vec<CatalogItem>> {
    Json(state.catalog.items().to_vec())
}

/// GET /catalog/:id
pub async fn get_catalog_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CatalogItem>> {
    state
        .catalog
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Catalog item {}", id)))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(list_catalog))
        .route("/catalog/:id", get(get_catalog_item))
}
