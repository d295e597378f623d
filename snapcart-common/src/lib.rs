//! # Snapcart Common Library
//!
//! Shared code for the snapcart checkout backend including:
//! - Catalog of recognizable items and their matching keywords
//! - Image hint matching engine
//! - Live item event broadcaster and SSE helpers
//! - Configuration loading
//! - Database schema and queries

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod matching;
pub mod sse;

pub use catalog::{Catalog, CatalogItem};
pub use error::{Error, Result};
pub use events::{EventBroadcaster, ItemEvent, Subscription};
pub use matching::{classify, ClassificationResult, DetectionHints};
