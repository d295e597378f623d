//! Server-Sent Events (SSE) stream of added items
//!
//! Every item added to a basket (or created through the item API) is pushed to
//! all connected viewers as one `data: {"id":..,"name":..,"price":..}` frame.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events - live item event stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    snapcart_common::sse::subscription_sse_stream(state.broadcaster.subscribe())
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}
