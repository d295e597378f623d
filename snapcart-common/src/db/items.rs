//! Item database operations

use super::models::Item;
use crate::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn item_from_row(row: &SqliteRow) -> Item {
    Item {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
    }
}

fn validate(item: &Item) -> Result<()> {
    if item.id.trim().is_empty() {
        return Err(Error::InvalidInput("Item id must not be empty".to_string()));
    }
    if item.name.trim().is_empty() {
        return Err(Error::InvalidInput("Item name must not be empty".to_string()));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(Error::InvalidInput(format!("Invalid price: {}", item.price)));
    }
    Ok(())
}

/// Insert a new item; fails with `Conflict` if the id is taken
pub async fn create_item(pool: &SqlitePool, item: &Item) -> Result<()> {
    validate(item)?;

    let result = sqlx::query("INSERT INTO items (id, name, price) VALUES (?, ?, ?)")
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.price)
        .execute(pool)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(Error::Conflict(format!("Item already exists: {}", item.id)))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get_item(pool: &SqlitePool, id: &str) -> Result<Option<Item>> {
    let row = sqlx::query("SELECT id, name, price FROM items WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(item_from_row))
}

pub async fn list_items(pool: &SqlitePool) -> Result<Vec<Item>> {
    let rows = sqlx::query("SELECT id, name, price FROM items ORDER BY rowid")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(item_from_row).collect())
}

/// Update name and price; returns false if no such item
pub async fn update_item(pool: &SqlitePool, item: &Item) -> Result<bool> {
    validate(item)?;

    let result = sqlx::query("UPDATE items SET name = ?, price = ? WHERE id = ?")
        .bind(&item.name)
        .bind(item.price)
        .bind(&item.id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an item (and its basket entries); returns false if no such item
pub async fn delete_item(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
