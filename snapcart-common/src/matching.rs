//! Image hint matching engine
//!
//! Turns the label/logo/text hints reported by the vision service into a single
//! best-guess catalog item. Pure and stateless: safe to call from any number of
//! request handlers at once.
//!
//! Each item is scored independently: every hint adds its weight to the item's
//! maximum, and adds the same weight to the item's score on a keyword hit. The
//! normalized score is `score / max` (defined as 0.0 when `max` is 0). Matching
//! is plain substring containment, not word matching.

use crate::catalog::{Catalog, CatalogItem};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weight of a detected label
pub const LABEL_WEIGHT: f64 = 1.0;

/// Weight of a detected logo (logo detection is the strongest signal)
pub const LOGO_WEIGHT: f64 = 3.0;

/// Weight of the detected text block
pub const TEXT_WEIGHT: f64 = 2.0;

/// Best candidate must score strictly above this to be accepted
pub const MATCH_THRESHOLD: f64 = 0.30;

/// Hints extracted from one image by the vision service
///
/// Produced once per classification request and discarded afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionHints {
    /// Label descriptions, lower-cased
    #[serde(default)]
    pub labels: Vec<String>,
    /// Logo descriptions, lower-cased
    #[serde(default)]
    pub logos: Vec<String>,
    /// Highest-confidence text annotation, lower-cased (empty if none)
    #[serde(default)]
    pub text: String,
}

impl DetectionHints {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.logos.is_empty() && self.text.is_empty()
    }
}

/// Verdict of a classification call
///
/// When `matched` is false only `confidence` (always 0.0) is meaningful; the
/// item fields are empty and must not be acted upon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub item_id: String,
    pub item_name: String,
    pub price: f64,
    pub confidence: f64,
    pub matched: bool,
}

impl ClassificationResult {
    /// The "not recognized" verdict
    pub fn unmatched() -> Self {
        Self::default()
    }

    fn accepted(item: &CatalogItem, confidence: f64) -> Self {
        Self {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            price: item.price,
            confidence,
            matched: true,
        }
    }
}

/// True if either string contains the other, ignoring case
fn contains_either_way(hint: &str, keyword: &str) -> bool {
    let hint = hint.to_lowercase();
    let keyword = keyword.to_lowercase();
    hint.contains(&keyword) || keyword.contains(&hint)
}

/// Normalized match score of one item against a set of hints, in `[0, 1]`
pub fn score_item(item: &CatalogItem, hints: &DetectionHints) -> f64 {
    let mut score = 0.0;
    let mut max_score = 0.0;

    for label in &hints.labels {
        max_score += LABEL_WEIGHT;
        if item.keywords.iter().any(|k| contains_either_way(label, k)) {
            score += LABEL_WEIGHT;
        }
    }

    for logo in &hints.logos {
        max_score += LOGO_WEIGHT;
        if item.keywords.iter().any(|k| contains_either_way(logo, k)) {
            score += LOGO_WEIGHT;
        }
    }

    // Text is only checked one way: the keyword must appear inside the text
    if !hints.text.is_empty() {
        max_score += TEXT_WEIGHT;
        let text = hints.text.to_lowercase();
        if item.keywords.iter().any(|k| text.contains(&k.to_lowercase())) {
            score += TEXT_WEIGHT;
        }
    }

    if max_score > 0.0 {
        score / max_score
    } else {
        0.0
    }
}

/// Pick the best catalog item for a set of hints
///
/// Items are scanned in catalog order and the first item with a strictly
/// greater score wins. Never fails: an empty catalog, empty hints, or a best
/// score at or below [`MATCH_THRESHOLD`] all yield [`ClassificationResult::unmatched`].
pub fn classify(hints: &DetectionHints, catalog: &Catalog) -> ClassificationResult {
    classify_items(hints, catalog.items())
}

/// Same as [`classify`] over a bare item slice
pub fn classify_items(hints: &DetectionHints, items: &[CatalogItem]) -> ClassificationResult {
    let mut best: Option<(&CatalogItem, f64)> = None;

    for item in items {
        let score = score_item(item, hints);
        debug!("Match score {:<30}: {:.2}%", item.name, score * 100.0);

        let best_score = best.map(|(_, s)| s).unwrap_or(0.0);
        if score > best_score {
            best = Some((item, score));
        }
    }

    match best {
        Some((item, score)) if score > MATCH_THRESHOLD => {
            debug!(
                "Best match: {} ({:.2}% confidence, threshold {:.0}%)",
                item.name,
                score * 100.0,
                MATCH_THRESHOLD * 100.0
            );
            ClassificationResult::accepted(item, score)
        }
        Some((item, score)) => {
            debug!(
                "Best candidate {} at {:.2}% is below threshold, not matched",
                item.name,
                score * 100.0
            );
            ClassificationResult::unmatched()
        }
        None => ClassificationResult::unmatched(),
    }
}
