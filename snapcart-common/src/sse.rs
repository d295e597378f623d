//! Server-Sent Events (SSE) utilities
//!
//! Turns a broadcaster [`Subscription`] into an axum SSE response.

use crate::events::Subscription;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info};

/// Keep-alive comment interval for idle streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream that forwards every message of `subscription`
///
/// Each published message becomes one `data: <payload>` frame, written as soon
/// as it arrives. The stream ends when the subscription closes; when the client
/// disconnects axum drops the stream, which drops the subscription and
/// unregisters it.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     snapcart_common::sse::subscription_sse_stream(state.broadcaster.subscribe())
/// }
/// ```
pub fn subscription_sse_stream(
    mut subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = subscription.id();
    info!("New SSE client connected to item events ({})", id);

    let stream = async_stream::stream! {
        while let Some(message) = subscription.recv().await {
            debug!("SSE: Forwarding item event to {}", id);
            yield Ok(Event::default().data(message));
        }
        info!("SSE: item event stream {} closed", id);
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    )
}
