//! Classifier adapter for the external vision service
//!
//! Sends image bytes to a label/logo/text detection service and normalizes the
//! answers into [`DetectionHints`] for the matching engine.
//!
//! # Failure policy
//! - Label detection is the primary channel: if it fails the whole call fails.
//! - Logo and text detection are secondary: a failure is logged and that
//!   channel contributes nothing.
//!
//! # API Reference
//! - Endpoint: https://vision.googleapis.com/v1/images:annotate
//! - Documentation: https://cloud.google.com/vision/docs/reference/rest/v1/images/annotate

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use snapcart_common::config::VisionConfig;
use snapcart_common::matching::{classify, ClassificationResult, DetectionHints};
use snapcart_common::Catalog;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors reported by a vision service backend
#[derive(Debug, Error)]
pub enum VisionError {
    /// Service could not be reached or is not configured
    #[error("Vision service unavailable: {0}")]
    Unavailable(String),

    /// Service answered with an error
    #[error("Vision API error: {0}")]
    Api(String),
}

/// Errors surfaced by [`Classifier`]
///
/// A photo that matches nothing is not an error; it is a successful
/// [`ClassificationResult`] with `matched = false`.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Payload is empty or not valid base64
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Vision service could not be reached or initialized
    #[error("Classifier unavailable: {0}")]
    AdapterUnavailable(String),

    /// Label detection failed
    #[error("Label detection failed: {0}")]
    PrimaryDetectionFailed(String),
}

/// Label/logo/text detection backend
///
/// Implementations return raw descriptions; normalization happens in
/// [`Classifier`].
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<String>, VisionError>;

    async fn detect_logos(&self, image: &[u8]) -> Result<Vec<String>, VisionError>;

    /// Text annotations, highest confidence first
    async fn detect_text(&self, image: &[u8]) -> Result<Vec<String>, VisionError>;
}

/// Google Cloud Vision REST client
pub struct GoogleVisionClient {
    /// HTTP client for API requests
    http_client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    label_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    logo_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Copy)]
enum Feature {
    Labels,
    Logos,
    Text,
}

impl Feature {
    fn api_name(self) -> &'static str {
        match self {
            Feature::Labels => "LABEL_DETECTION",
            Feature::Logos => "LOGO_DETECTION",
            Feature::Text => "TEXT_DETECTION",
        }
    }
}

impl GoogleVisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VisionError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            max_results: config.max_results,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn annotate(&self, image: &[u8], feature: Feature) -> Result<Vec<String>, VisionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| VisionError::Unavailable("No vision API key configured".to_string()))?;

        // Text detection only needs the single best annotation
        let max_results = match feature {
            Feature::Text => 1,
            _ => self.max_results,
        };

        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": feature.api_name(), "maxResults": max_results }],
            }]
        });

        debug!("Requesting {} from vision service", feature.api_name());

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    VisionError::Unavailable(format!("Request failed: {}", e))
                } else {
                    VisionError::Api(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Api(format!("Failed to parse response: {}", e)))?;

        let image_response = parsed.responses.into_iter().next().unwrap_or_default();
        if let Some(error) = image_response.error {
            return Err(VisionError::Api(format!("{} (code {})", error.message, error.code)));
        }

        let annotations = match feature {
            Feature::Labels => image_response.label_annotations,
            Feature::Logos => image_response.logo_annotations,
            Feature::Text => image_response.text_annotations,
        };

        Ok(annotations.into_iter().map(|a| a.description).collect())
    }
}

#[async_trait]
impl VisionService for GoogleVisionClient {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<String>, VisionError> {
        self.annotate(image, Feature::Labels).await
    }

    async fn detect_logos(&self, image: &[u8]) -> Result<Vec<String>, VisionError> {
        self.annotate(image, Feature::Logos).await
    }

    async fn detect_text(&self, image: &[u8]) -> Result<Vec<String>, VisionError> {
        self.annotate(image, Feature::Text).await
    }
}

/// Image classifier: vision service + matching engine
#[derive(Clone)]
pub struct Classifier {
    service: Arc<dyn VisionService>,
}

impl Classifier {
    pub fn new(service: Arc<dyn VisionService>) -> Self {
        Self { service }
    }

    /// Run all three detections and normalize them into hints
    pub async fn detect_hints(&self, image: &[u8]) -> Result<DetectionHints, ClassifyError> {
        if image.is_empty() {
            return Err(ClassifyError::InvalidImage("Image payload is empty".to_string()));
        }

        let (labels, logos, texts) = tokio::join!(
            self.service.detect_labels(image),
            self.service.detect_logos(image),
            self.service.detect_text(image),
        );

        let labels = labels.map_err(|e| match e {
            VisionError::Unavailable(msg) => ClassifyError::AdapterUnavailable(msg),
            VisionError::Api(msg) => ClassifyError::PrimaryDetectionFailed(msg),
        })?;

        let logos = logos.unwrap_or_else(|e| {
            warn!("Logo detection degraded, continuing without logos: {}", e);
            Vec::new()
        });

        let texts = texts.unwrap_or_else(|e| {
            warn!("Text detection degraded, continuing without text: {}", e);
            Vec::new()
        });

        let hints = DetectionHints {
            labels: labels.iter().map(|l| l.to_lowercase()).collect(),
            logos: logos.iter().map(|l| l.to_lowercase()).collect(),
            text: texts.first().map(|t| t.to_lowercase()).unwrap_or_default(),
        };

        info!(
            "Vision results: {} labels {:?}, {} logos {:?}, text {:?}",
            hints.labels.len(),
            hints.labels,
            hints.logos.len(),
            hints.logos,
            hints.text
        );

        Ok(hints)
    }

    /// Classify raw image bytes against the catalog
    pub async fn classify_image(
        &self,
        image: &[u8],
        catalog: &Catalog,
    ) -> Result<ClassificationResult, ClassifyError> {
        let hints = self.detect_hints(image).await?;
        let result = classify(&hints, catalog);

        if result.matched {
            info!(
                "Classified image as {} ({:.2}% confidence)",
                result.item_id,
                result.confidence * 100.0
            );
        } else {
            info!("Image not recognized");
        }

        Ok(result)
    }

    /// Classify a base64-encoded image (a `data:` URL prefix is accepted)
    pub async fn classify_base64(
        &self,
        encoded: &str,
        catalog: &Catalog,
    ) -> Result<ClassificationResult, ClassifyError> {
        let image = decode_base64_image(encoded)?;
        self.classify_image(&image, catalog).await
    }
}

/// Decode base64 image text, stripping an optional `data:<mime>;base64,` prefix
///
/// Line breaks and other ASCII whitespace inside the payload are ignored, so
/// MIME-style wrapped input decodes.
pub fn decode_base64_image(encoded: &str) -> Result<Vec<u8>, ClassifyError> {
    let trimmed = encoded.trim();
    let payload = match trimmed.split_once("base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(payload)
        .map_err(|e| ClassifyError::InvalidImage(format!("Failed to decode base64 image: {}", e)))
}
