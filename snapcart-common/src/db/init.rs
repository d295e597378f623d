//! Database initialization
//!
//! Creates the schema on first run and seeds it from the catalog.

use crate::catalog::Catalog;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open (or create) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            price REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS baskets (
            basket_id TEXT PRIMARY KEY,
            owner_name TEXT NOT NULL,
            create_date TEXT NOT NULL,
            status TEXT CHECK(status IN ('pending', 'canceled', 'paid')) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per unit; adding the same item twice stores two rows
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS item_basket (
            entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            basket_id TEXT NOT NULL REFERENCES baskets(basket_id) ON DELETE CASCADE,
            added_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_item_basket_basket ON item_basket(basket_id)")
        .execute(pool)
        .await?;

    info!("Tables created (items, baskets, item_basket)");
    Ok(())
}

/// Insert every catalog item that is not stored yet
///
/// Returns the number of rows inserted.
pub async fn seed_catalog(pool: &SqlitePool, catalog: &Catalog) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for item in catalog.items() {
        let result = sqlx::query("INSERT OR IGNORE INTO items (id, name, price) VALUES (?, ?, ?)")
            .bind(&item.id)
            .bind(&item.name)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    info!("Seeded {} of {} catalog items", inserted, catalog.len());
    Ok(inserted)
}

/// Drop all tables
pub async fn drop_tables(pool: &SqlitePool) -> Result<()> {
    for table in ["item_basket", "baskets", "items"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    info!("Database tables dropped");
    Ok(())
}

/// Drop, recreate and reseed the database
pub async fn reset_database(pool: &SqlitePool, catalog: &Catalog) -> Result<()> {
    drop_tables(pool).await?;
    create_tables(pool).await?;
    seed_catalog(pool, catalog).await?;
    info!("Database reset complete");
    Ok(())
}
