//! Photo classification endpoints
//!
//! A successful call always answers 200, including "not recognized"
//! (`matched = false`). Bad payloads answer 400, an unreachable vision service
//! 503, and a failed label detection 502.
//!
//! With a `basketId`, a matched item is also added to that basket and
//! announced on the live stream.

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use snapcart_common::db;
use snapcart_common::matching::ClassificationResult;
use uuid::Uuid;

use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyParams {
    pub basket_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyBase64Request {
    /// Base64 image, optionally as a `data:` URL
    pub image: String,
    pub basket_id: Option<Uuid>,
}

/// Add the matched item to the basket if one was named
async fn add_if_requested(
    state: &AppState,
    result: &ClassificationResult,
    basket_id: Option<Uuid>,
) -> ApiResult<()> {
    let Some(basket_id) = basket_id else {
        return Ok(());
    };
    if !result.matched {
        return Ok(());
    }

    let item = db::add_item_to_basket(&state.db, basket_id, &result.item_id).await?;
    state.announce_item(&item);
    Ok(())
}

/// POST /classify-item - raw image bytes in the body
pub async fn classify_item(
    State(state): State<AppState>,
    Query(params): Query<ClassifyParams>,
    body: Bytes,
) -> ApiResult<Json<ClassificationResult>> {
    let result = state.classifier.classify_image(&body, &state.catalog).await?;
    add_if_requested(&state, &result, params.basket_id).await?;
    Ok(Json(result))
}

/// POST /classify-item/base64 - `{"image": "<base64>"}`
pub async fn classify_item_base64(
    State(state): State<AppState>,
    Json(request): Json<ClassifyBase64Request>,
) -> ApiResult<Json<ClassificationResult>> {
    let result = state
        .classifier
        .classify_base64(&request.image, &state.catalog)
        .await?;
    add_if_requested(&state, &result, request.basket_id).await?;
    Ok(Json(result))
}

pub fn classify_routes() -> Router<AppState> {
    Router::new()
        .route("/classify-item", post(classify_item))
        .route("/classify-item/base64", post(classify_item_base64))
}
