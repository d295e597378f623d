//! Basket endpoints
//!
//! The basket is always named in the path, so any number of shoppers can fill
//! baskets at the same time.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use snapcart_common::db::{self, Basket, BasketDetails, BasketStatus, Item};
use snapcart_common::Catalog;
use uuid::Uuid;

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBasketRequest {
    pub owner_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BasketStatus,
}

/// Body of POST /baskets/:basket_id/items
///
/// Names the item either by id or by catalog display name (case-insensitive).
/// `itemId` wins when both are given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub item_id: Option<String>,
    pub item_name: Option<String>,
}

impl AddItemRequest {
    fn resolve_item_id(&self, catalog: &Catalog) -> ApiResult<String> {
        if let Some(id) = &self.item_id {
            return Ok(id.clone());
        }

        let Some(name) = &self.item_name else {
            return Err(ApiError::BadRequest(
                "Either itemId or itemName is required".to_string(),
            ));
        };

        catalog
            .find_by_name(name)
            .map(|item| item.id.clone())
            .ok_or_else(|| ApiError::NotFound(format!("Catalog item named {:?}", name)))
    }
}

/// POST /baskets
pub async fn create_basket(
    State(state): State<AppState>,
    Json(request): Json<CreateBasketRequest>,
) -> ApiResult<(StatusCode, Json<Basket>)> {
    let basket = db::create_basket(&state.db, &request.owner_name).await?;
    Ok((StatusCode::CREATED, Json(basket)))
}

/// GET /baskets
pub async fn list_baskets(State(state): State<AppState>) -> ApiResult<Json<Vec<Basket>>> {
    Ok(Json(db::list_baskets(&state.db).await?))
}

/// GET /baskets/:basket_id - basket with items and total
pub async fn get_basket(
    State(state): State<AppState>,
    Path(basket_id): Path<Uuid>,
) -> ApiResult<Json<BasketDetails>> {
    db::basket_details(&state.db, basket_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Basket {}", basket_id)))
}

/// PUT /baskets/:basket_id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(basket_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Basket>> {
    let basket = db::set_basket_status(&state.db, basket_id, request.status).await?;
    Ok(Json(basket))
}

/// POST /baskets/:basket_id/items - add one unit (by id or catalog name) and announce it
pub async fn add_item(
    State(state): State<AppState>,
    Path(basket_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let item_id = request.resolve_item_id(&state.catalog)?;
    let item = db::add_item_to_basket(&state.db, basket_id, &item_id).await?;
    state.announce_item(&item);
    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /baskets/:basket_id/items/:item_id - remove one unit
pub async fn remove_item(
    State(state): State<AppState>,
    Path((basket_id, item_id)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    if !db::remove_item_from_basket(&state.db, basket_id, &item_id).await? {
        return Err(ApiError::NotFound(format!(
            "Item {} in basket {}",
            item_id, basket_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn basket_routes() -> Router<AppState> {
    Router::new()
        .route("/baskets", get(list_baskets).post(create_basket))
        .route("/baskets/:basket_id", get(get_basket))
        .route("/baskets/:basket_id/status", put(update_status))
        .route("/baskets/:basket_id/items", post(add_item))
        .route("/baskets/:basket_id/items/:item_id", delete(remove_item))
}
