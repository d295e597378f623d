//! Item CRUD endpoints
//!
//! Creating an item is announced on the live event stream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use snapcart_common::db::{self, Item};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

/// Body of PUT /items/:id
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: String,
    pub price: f64,
}

/// GET /items
pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(db::list_items(&state.db).await?))
}

/// GET /items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Item>> {
    db::get_item(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Item {}", id)))
}

/// POST /items
pub async fn create_item(
    State(state): State<AppState>,
    Json(item): Json<Item>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    db::create_item(&state.db, &item).await?;
    info!("Created item {}", item.id);

    state.announce_item(&item);
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /items/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> ApiResult<Json<Item>> {
    let item = Item {
        id,
        name: request.name,
        price: request.price,
    };

    if !db::update_item(&state.db, &item).await? {
        return Err(ApiError::NotFound(format!("Item {}", item.id)));
    }

    info!("Updated item {}", item.id);
    Ok(Json(item))
}

/// DELETE /items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !db::delete_item(&state.db, &id).await? {
        return Err(ApiError::NotFound(format!("Item {}", id)));
    }

    info!("Deleted item {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).put(update_item).delete(delete_item))
}
