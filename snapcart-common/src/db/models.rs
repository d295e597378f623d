//! Database models

use crate::events::ItemEvent;
use crate::Error;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stored item (`items` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price: f64,
}

impl From<&Item> for ItemEvent {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
        }
    }
}

/// Basket lifecycle state
///
/// `Pending` is the only state that accepts item changes; `Paid` and
/// `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasketStatus {
    Pending,
    Canceled,
    Paid,
}

impl BasketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasketStatus::Pending => "pending",
            BasketStatus::Canceled => "canceled",
            BasketStatus::Paid => "paid",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BasketStatus::Pending)
    }

    /// Whether a basket in this state may move to `next`
    pub fn can_transition_to(&self, next: BasketStatus) -> bool {
        matches!(
            (self, next),
            (BasketStatus::Pending, BasketStatus::Paid) | (BasketStatus::Pending, BasketStatus::Canceled)
        )
    }
}

impl fmt::Display for BasketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BasketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BasketStatus::Pending),
            "canceled" => Ok(BasketStatus::Canceled),
            "paid" => Ok(BasketStatus::Paid),
            other => Err(Error::InvalidInput(format!("Unknown basket status: {}", other))),
        }
    }
}

/// Stored basket (`baskets` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basket {
    pub basket_id: Uuid,
    pub owner_name: String,
    pub create_date: NaiveDate,
    pub status: BasketStatus,
}

/// Basket together with its contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketDetails {
    #[serde(flatten)]
    pub basket: Basket,
    pub items: Vec<Item>,
    pub total: f64,
}
