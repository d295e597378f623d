//! Integration tests for snapcart-server API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Catalog and item CRUD
//! - Basket lifecycle
//! - Photo classification (with a canned vision backend)
//! - Live item event stream

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use snapcart_common::{db, Catalog, EventBroadcaster};
use snapcart_server::vision::{Classifier, VisionError, VisionService};
use snapcart_server::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// How the canned vision backend should answer
#[derive(Clone, Copy)]
enum VisionMode {
    /// Reports a Pepsi can
    Pepsi,
    /// Reports something not in the catalog
    Landscape,
    /// Label detection errors out
    LabelsFail,
    /// Service unreachable
    Offline,
}

struct CannedVision {
    mode: VisionMode,
}

#[async_trait]
impl VisionService for CannedVision {
    async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<String>, VisionError> {
        match self.mode {
            VisionMode::Pepsi => Ok(vec!["Cola".into(), "Tin".into(), "Beverage".into()]),
            VisionMode::Landscape => Ok(vec!["Mountain".into(), "Sky".into()]),
            VisionMode::LabelsFail => Err(VisionError::Api("quota exceeded".into())),
            VisionMode::Offline => Err(VisionError::Unavailable("connection refused".into())),
        }
    }

    async fn detect_logos(&self, _image: &[u8]) -> Result<Vec<String>, VisionError> {
        match self.mode {
            VisionMode::Pepsi => Ok(vec!["Pepsi".into()]),
            _ => Err(VisionError::Api("logo detection failed".into())),
        }
    }

    async fn detect_text(&self, _image: &[u8]) -> Result<Vec<String>, VisionError> {
        Ok(vec![])
    }
}

/// Test helper: app over a fresh seeded database
async fn setup_app(mode: VisionMode) -> (TempDir, axum::Router, AppState) {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = db::init_database(&dir.path().join("snapcart.db"))
        .await
        .expect("Should initialize database");
    let catalog = Catalog::builtin();
    db::seed_catalog(&pool, &catalog).await.expect("Should seed");

    let classifier = Classifier::new(Arc::new(CannedVision { mode }));
    let state = AppState::new(pool, catalog, classifier, EventBroadcaster::new(16));
    (dir, build_router(state.clone()), state)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn image_request(uri: &str, bytes: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(bytes))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn create_basket(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/baskets", json!({"ownerName": "Demo User"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    body["basketId"].as_str().unwrap().to_string()
}

/// Read the next SSE frame and return its `data:` payload
async fn next_event(body: &mut Body) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
            .await
            .expect("Timed out waiting for event")
            .expect("Stream ended")
            .expect("Frame error");

        let Ok(data) = frame.into_data() else { continue };
        let text = String::from_utf8(data.to_vec()).unwrap();
        if let Some(payload) = text.strip_prefix("data: ") {
            return serde_json::from_str(payload.trim_end()).expect("Should parse event JSON");
        }
    }
}

// =============================================================================
// Health / catalog
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "snapcart-server");
    assert_eq!(body["catalog_items"], 4);
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;

    let response = app.clone().oneshot(test_request("GET", "/catalog")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/catalog/estrella-chips"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["price"], 2.99);
    assert!(body["keywords"].is_array());

    let response = app.oneshot(test_request("GET", "/catalog/red-bull")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/items")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

// =============================================================================
// Items
// =============================================================================

#[tokio::test]
async fn test_item_crud() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/items",
            json!({"id": "red-bull", "name": "Red Bull Can", "price": 2.49}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/items/red-bull",
            json!({"name": "Red Bull Sugarfree", "price": 2.59}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(test_request("GET", "/items/red-bull")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["name"], "Red Bull Sugarfree");

    let response = app.clone().oneshot(test_request("GET", "/items")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 5);

    let response = app.clone().oneshot(test_request("DELETE", "/items/red-bull")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(test_request("DELETE", "/items/red-bull")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_item_conflict() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/items",
            json!({"id": "pepsi-max", "name": "Pepsi Max", "price": 1.99}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
}

// =============================================================================
// Baskets
// =============================================================================

#[tokio::test]
async fn test_basket_flow() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;
    let basket_id = create_basket(&app).await;

    for item_id in ["pepsi-max", "sunmaid-sour-raisins"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/baskets/{}/items", basket_id),
                json!({"itemId": item_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(test_request("GET", &format!("/baskets/{}", basket_id)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3.49);

    let response = app
        .clone()
        .oneshot(test_request(
            "DELETE",
            &format!("/baskets/{}/items/pepsi-max", basket_id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/baskets/{}/status", basket_id),
            json!({"status": "paid"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/baskets/{}/items", basket_id),
            json!({"itemId": "pepsi-max"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_add_item_by_catalog_name() {
    let (_dir, app, state) = setup_app(VisionMode::Pepsi).await;
    let basket_id = create_basket(&app).await;
    let mut viewer = state.broadcaster.subscribe();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/baskets/{}/items", basket_id),
            json!({"itemName": "estrella maapähkinä rinkula"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["id"], "estrella-chips");

    let event: Value = serde_json::from_str(&viewer.try_recv().unwrap()).unwrap();
    assert_eq!(event["id"], "estrella-chips");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/baskets/{}/items", basket_id),
            json!({"itemName": "Red Bull Can"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/baskets/{}/items", basket_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_basket_and_item() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;
    let basket_id = create_basket(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/baskets/{}/items", uuid::Uuid::new_v4()),
            json!({"itemId": "pepsi-max"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/baskets/{}/items", basket_id),
            json!({"itemId": "red-bull"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(test_request("GET", "/baskets/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Classification
// =============================================================================

#[tokio::test]
async fn test_classify_matched() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;

    let response = app
        .oneshot(image_request("/classify-item", b"\xff\xd8\xff fake jpeg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["matched"], true);
    assert_eq!(body["itemId"], "pepsi-max");
    assert_eq!(body["itemName"], "Pepsi Max");
    assert_eq!(body["confidence"], 1.0);
}

#[tokio::test]
async fn test_classify_not_recognized_is_ok() {
    let (_dir, app, _state) = setup_app(VisionMode::Landscape).await;

    let response = app
        .oneshot(image_request("/classify-item", b"photo"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["matched"], false);
    assert_eq!(body["confidence"], 0.0);
}

#[tokio::test]
async fn test_classify_error_statuses() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;
    let response = app.oneshot(image_request("/classify-item", b"")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_dir, app, _state) = setup_app(VisionMode::LabelsFail).await;
    let response = app.oneshot(image_request("/classify-item", b"photo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let (_dir, app, _state) = setup_app(VisionMode::Offline).await;
    let response = app.oneshot(image_request("/classify-item", b"photo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CLASSIFIER_UNAVAILABLE");
}

#[tokio::test]
async fn test_classify_base64() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/classify-item/base64",
            json!({"image": format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpeg"))}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["itemId"], "pepsi-max");

    let response = app
        .oneshot(json_request(
            "POST",
            "/classify-item/base64",
            json!({"image": "!!not base64!!"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_classify_into_basket() {
    let (_dir, app, state) = setup_app(VisionMode::Pepsi).await;
    let basket_id = create_basket(&app).await;

    let response = app
        .oneshot(image_request(
            &format!("/classify-item?basketId={}", basket_id),
            b"photo",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let items = db::list_basket_items(&state.db, basket_id.parse().unwrap())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "pepsi-max");
}

#[tokio::test]
async fn test_unrecognized_photo_leaves_basket_untouched() {
    let (_dir, app, state) = setup_app(VisionMode::Landscape).await;
    let basket_id = create_basket(&app).await;
    let mut viewer = state.broadcaster.subscribe();

    let response = app
        .oneshot(image_request(
            &format!("/classify-item?basketId={}", basket_id),
            b"photo",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["matched"], false);

    let items = db::list_basket_items(&state.db, basket_id.parse().unwrap())
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(viewer.try_recv(), None);
}

// =============================================================================
// Live events
// =============================================================================

#[tokio::test]
async fn test_event_stream_receives_basket_additions() {
    let (_dir, app, state) = setup_app(VisionMode::Pepsi).await;
    let basket_id = create_basket(&app).await;

    let response = app.clone().oneshot(test_request("GET", "/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(state.broadcaster.subscriber_count(), 1);
    let mut stream = response.into_body();

    for item_id in ["vitamin-well-refresh", "estrella-chips"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/baskets/{}/items", basket_id),
                json!({"itemId": item_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let first = next_event(&mut stream).await;
    assert_eq!(first, json!({"id": "vitamin-well-refresh", "name": "Vitamin Well Refresh", "price": 3.29}));
    let second = next_event(&mut stream).await;
    assert_eq!(second["id"], "estrella-chips");

    // Dropping the stream unregisters the viewer
    drop(stream);
    assert_eq!(state.broadcaster.subscriber_count(), 0);
}

#[tokio::test]
async fn test_event_stream_fans_out_to_all_viewers() {
    let (_dir, app, state) = setup_app(VisionMode::Pepsi).await;

    let mut streams = Vec::new();
    for _ in 0..3 {
        let response = app.clone().oneshot(test_request("GET", "/events")).await.unwrap();
        streams.push(response.into_body());
    }
    assert_eq!(state.broadcaster.subscriber_count(), 3);

    let response = app
        .oneshot(json_request(
            "POST",
            "/items",
            json!({"id": "chips-bag", "name": "Chips Bag", "price": 1.99}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    for stream in streams.iter_mut() {
        let event = next_event(stream).await;
        assert_eq!(event["id"], "chips-bag");
    }
}

#[tokio::test]
async fn test_event_stream_ends_on_shutdown() {
    let (_dir, app, state) = setup_app(VisionMode::Pepsi).await;

    let response = app.oneshot(test_request("GET", "/events")).await.unwrap();
    let mut stream = response.into_body();

    state.broadcaster.shutdown();

    let end = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = stream.frame().await {
            frame.expect("Frame error");
        }
    })
    .await;
    assert!(end.is_ok(), "Stream should end after shutdown");
}

#[tokio::test]
async fn test_event_stream_opened_after_shutdown_ends() {
    let (_dir, app, state) = setup_app(VisionMode::Pepsi).await;
    state.broadcaster.shutdown();

    let response = app.oneshot(test_request("GET", "/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.broadcaster.subscriber_count(), 0);

    let mut stream = response.into_body();
    let end = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = stream.frame().await {
            frame.expect("Frame error");
        }
    })
    .await;
    assert!(end.is_ok(), "Stream opened during shutdown should end");
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_reset_clears_baskets() {
    let (_dir, app, _state) = setup_app(VisionMode::Pepsi).await;
    create_basket(&app).await;

    let response = app.clone().oneshot(test_request("POST", "/admin/reset")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(test_request("GET", "/baskets")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body.as_array().unwrap().is_empty());
}
