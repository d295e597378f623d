//! Catalog of items the image matcher can recognize
//!
//! The catalog is loaded once at startup (either the built-in demo table or a
//! TOML override) and is read-only afterwards. Keywords are stored lower-cased.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A purchasable item together with the terms used to recognize it in photos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable unique identifier (e.g. "pepsi-max")
    pub id: String,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Lower-cased matching terms
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, keywords: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// TOML layout for a catalog override file
///
/// ```toml
/// [[items]]
/// id = "pepsi-max"
/// name = "Pepsi Max"
/// price = 1.99
/// keywords = ["pepsi", "cola", "can"]
/// ```
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<CatalogItem>,
}

/// Immutable, ordered list of catalog items
///
/// Order matters: the matcher resolves score ties in favor of the item that
/// appears first.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog, lower-casing keywords and rejecting duplicate ids
    pub fn new(items: Vec<CatalogItem>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(items.len());

        for mut item in items {
            if item.id.trim().is_empty() {
                return Err(Error::Config("Catalog item with empty id".to_string()));
            }
            if !seen.insert(item.id.clone()) {
                return Err(Error::Config(format!("Duplicate catalog item id: {}", item.id)));
            }
            // Kept verbatim apart from case; whitespace-only keywords are
            // dropped since they would be a substring of most hints
            item.keywords = item
                .keywords
                .iter()
                .filter(|k| !k.trim().is_empty())
                .map(|k| k.to_lowercase())
                .collect();
            normalized.push(item);
        }

        Ok(Self { items: normalized })
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid catalog file: {}", e)))?;

        if file.items.is_empty() {
            return Err(Error::Config("Catalog file contains no items".to_string()));
        }

        Self::new(file.items)
    }

    /// Load a catalog override from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!("Loaded {} catalog items from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// The demo catalog shipped with the service
    pub fn builtin() -> Self {
        Self {
            items: vec![
                CatalogItem::new(
                    "pepsi-max",
                    "Pepsi Max",
                    1.99,
                    &[
                        "pepsi", "pepsi max", "cola", "soda",
                        "soft drink", "carbonated soft drinks", "soft drinks",
                        "can", "aluminum can", "steel and tin cans", "tin", "cans",
                        "beverage", "drink", "non-alcoholic drink", "liquid",
                        "carbonated", "cylinder", "aluminum",
                        "logo", "label", "black", "thirsty",
                        "steel", "gadget", "plastic",
                    ],
                ),
                CatalogItem::new(
                    "sunmaid-sour-raisins",
                    "Sunmaid Sour Raisins",
                    1.50,
                    &[
                        "sun-maid", "sunmaid", "sun maid",
                        "raisin", "raisins", "sour", "sour raisin",
                        "golden raisins", "dried fruit",
                        "snack", "snacks", "box", "fruit",
                        "packaging and labeling", "label", "logo",
                        "watermelon", "flavored", "natural flavors",
                    ],
                ),
                CatalogItem::new(
                    "vitamin-well-refresh",
                    "Vitamin Well Refresh",
                    3.29,
                    &[
                        "vitamin well", "vitamin", "well", "refresh",
                        "bottle", "plastic bottle", "water bottle", "glass",
                        "drink", "beverage", "water", "vitamin water", "soft drink",
                        "functional drink", "fluid", "liquid",
                        "drinkware", "label", "bottle cap", "personal care",
                        "chemical compound", "plastic",
                        "b12", "c-vitamiini", "sinkki", "lemonaden", "kiivin",
                        "calorie", "juoma",
                    ],
                ),
                CatalogItem::new(
                    "estrella-chips",
                    "Estrella Maapähkinä Rinkula",
                    2.99,
                    &[
                        "estrella",
                        "maapähkinä", "rinkula", "maapähkinävoita",
                        "chips", "crisps", "snack", "snack-renkait", "peanut",
                        "bag", "potato chips", "salty snack",
                        "ingredient", "food", "breakfast cereal", "cereal",
                        "finger food", "packaging and labeling", "produce",
                        "junk food", "breakfast box", "convenience food",
                        "fast food", "staple food", "recipe",
                        "label", "logo", "graphic design", "advertising",
                        "natural foods",
                        "vegan", "makean suolainen", "rouskuva", "maku",
                    ],
                ),
            ],
        }
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Look up an item by display name, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<&CatalogItem> {
        let wanted = name.trim().to_lowercase();
        self.items
            .iter()
            .find(|item| item.name.to_lowercase() == wanted)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
