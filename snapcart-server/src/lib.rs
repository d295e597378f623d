//! snapcart-server library - checkout backend HTTP service
//!
//! Catalog and basket REST API, photo classification, and a live stream of
//! item additions.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use snapcart_common::db::Item;
use snapcart_common::{Catalog, EventBroadcaster, ItemEvent};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

pub mod api;
pub mod error;
pub mod vision;

pub use crate::error::{ApiError, ApiResult};
use crate::vision::Classifier;

/// Upper bound for uploaded photos
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Recognizable items, read-only after startup
    pub catalog: Arc<Catalog>,
    /// Vision service adapter
    pub classifier: Classifier,
    /// Live item event fan-out
    pub broadcaster: EventBroadcaster,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        catalog: Catalog,
        classifier: Classifier,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            db,
            catalog: Arc::new(catalog),
            classifier,
            broadcaster,
        }
    }

    /// Tell every live viewer that an item was added
    ///
    /// Best effort: failures are logged, never returned to the caller.
    pub fn announce_item(&self, item: &Item) {
        match self.broadcaster.publish_json(&ItemEvent::from(item)) {
            Ok(count) => debug!("Announced {} to {} viewers", item.id, count),
            Err(e) => warn!("Failed to announce {}: {}", item.id, e),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(api::health_routes())
        .merge(api::catalog_routes())
        .merge(api::item_routes())
        .merge(api::basket_routes())
        .merge(api::classify_routes())
        .merge(api::event_routes())
        .merge(api::admin_routes())
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
