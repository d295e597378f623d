//! Basket database operations
//!
//! Every operation names its basket explicitly; there is no process-wide
//! "active" basket.

use super::items::get_item;
use super::models::{Basket, BasketDetails, BasketStatus, Item};
use crate::{Error, Result};
use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn basket_from_row(row: &SqliteRow) -> Result<Basket> {
    let id: String = row.get("basket_id");
    let date: String = row.get("create_date");
    let status: String = row.get("status");

    Ok(Basket {
        basket_id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Corrupt basket id {}: {}", id, e)))?,
        owner_name: row.get("owner_name"),
        create_date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .map_err(|e| Error::Internal(format!("Corrupt basket date {}: {}", date, e)))?,
        status: status.parse()?,
    })
}

/// Create a new pending basket dated today
pub async fn create_basket(pool: &SqlitePool, owner_name: &str) -> Result<Basket> {
    let owner_name = owner_name.trim();
    if owner_name.is_empty() {
        return Err(Error::InvalidInput("Owner name must not be empty".to_string()));
    }

    let basket = Basket {
        basket_id: Uuid::new_v4(),
        owner_name: owner_name.to_string(),
        create_date: Utc::now().date_naive(),
        status: BasketStatus::Pending,
    };

    sqlx::query(
        "INSERT INTO baskets (basket_id, owner_name, create_date, status) VALUES (?, ?, ?, ?)",
    )
    .bind(basket.basket_id.to_string())
    .bind(&basket.owner_name)
    .bind(basket.create_date.format(DATE_FORMAT).to_string())
    .bind(basket.status.as_str())
    .execute(pool)
    .await?;

    tracing::info!("Created basket {} for {}", basket.basket_id, basket.owner_name);
    Ok(basket)
}

pub async fn get_basket(pool: &SqlitePool, basket_id: Uuid) -> Result<Option<Basket>> {
    let row = sqlx::query(
        "SELECT basket_id, owner_name, create_date, status FROM baskets WHERE basket_id = ?",
    )
    .bind(basket_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(basket_from_row).transpose()
}

pub async fn list_baskets(pool: &SqlitePool) -> Result<Vec<Basket>> {
    let rows = sqlx::query(
        "SELECT basket_id, owner_name, create_date, status FROM baskets ORDER BY rowid",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(basket_from_row).collect()
}

/// Move a basket to a new status
///
/// Only `pending -> paid` and `pending -> canceled` are allowed.
pub async fn set_basket_status(
    pool: &SqlitePool,
    basket_id: Uuid,
    status: BasketStatus,
) -> Result<Basket> {
    let mut basket = get_basket(pool, basket_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Basket {}", basket_id)))?;

    if !basket.status.can_transition_to(status) {
        return Err(Error::Conflict(format!(
            "Basket {} cannot move from {} to {}",
            basket_id, basket.status, status
        )));
    }

    // Guard on the old status so two concurrent transitions cannot both win
    let result = sqlx::query("UPDATE baskets SET status = ? WHERE basket_id = ? AND status = ?")
        .bind(status.as_str())
        .bind(basket_id.to_string())
        .bind(basket.status.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!("Basket {} changed concurrently", basket_id)));
    }

    tracing::info!("Basket {} is now {}", basket_id, status);
    basket.status = status;
    Ok(basket)
}

/// Add one unit of an item to a pending basket
///
/// The pending check and the insert are one statement, so a basket that is
/// paid or canceled concurrently never gains an entry. Returns the added item
/// so the caller can announce it.
pub async fn add_item_to_basket(pool: &SqlitePool, basket_id: Uuid, item_id: &str) -> Result<Item> {
    let item = get_item(pool, item_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Item {}", item_id)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO item_basket (item_id, basket_id)
        SELECT ?, ?
        WHERE EXISTS (SELECT 1 FROM baskets WHERE basket_id = ? AND status = 'pending')
        "#,
    )
    .bind(&item.id)
    .bind(basket_id.to_string())
    .bind(basket_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(match get_basket(pool, basket_id).await? {
            None => Error::NotFound(format!("Basket {}", basket_id)),
            Some(basket) => Error::Conflict(format!(
                "Basket {} is {} and cannot be changed",
                basket_id, basket.status
            )),
        });
    }

    tracing::info!("Added {} to basket {}", item.id, basket_id);
    Ok(item)
}

/// Remove one unit of an item from a pending basket; returns false if absent
pub async fn remove_item_from_basket(
    pool: &SqlitePool,
    basket_id: Uuid,
    item_id: &str,
) -> Result<bool> {
    let basket = get_basket(pool, basket_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Basket {}", basket_id)))?;

    if basket.status.is_terminal() {
        return Err(Error::Conflict(format!(
            "Basket {} is {} and cannot be changed",
            basket_id, basket.status
        )));
    }

    let result = sqlx::query(
        r#"
        DELETE FROM item_basket WHERE entry_id = (
            SELECT entry_id FROM item_basket
            WHERE basket_id = ? AND item_id = ?
            ORDER BY entry_id DESC
            LIMIT 1
        )
        "#,
    )
    .bind(basket_id.to_string())
    .bind(item_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Items in a basket, in the order they were added
pub async fn list_basket_items(pool: &SqlitePool, basket_id: Uuid) -> Result<Vec<Item>> {
    let rows = sqlx::query(
        r#"
        SELECT i.id, i.name, i.price
        FROM item_basket ib
        JOIN items i ON i.id = ib.item_id
        WHERE ib.basket_id = ?
        ORDER BY ib.entry_id
        "#,
    )
    .bind(basket_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Item {
            id: row.get("id"),
            name: row.get("name"),
            price: row.get("price"),
        })
        .collect())
}

/// Basket with its items and total price
pub async fn basket_details(pool: &SqlitePool, basket_id: Uuid) -> Result<Option<BasketDetails>> {
    let Some(basket) = get_basket(pool, basket_id).await? else {
        return Ok(None);
    };

    let items = list_basket_items(pool, basket_id).await?;
    let total = basket_total(&items);

    Ok(Some(BasketDetails { basket, items, total }))
}

/// Sum of item prices, rounded to cents
pub fn basket_total(items: &[Item]) -> f64 {
    let sum: f64 = items.iter().map(|i| i.price).sum();
    (sum * 100.0).round() / 100.0
}
