use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{ContentItem, ItemMeta, NewContentItem};

// ========== Content Items ==========

/// Case-fold a title for lookups, over the full Unicode range.
pub fn fold_title(title: &str) -> String {
    title.to_lowercase()
}

/// Insert a new content item, returning its ID.
pub async fn insert_content_item(pool: &SqlitePool, item: &NewContentItem) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO content_items (title, title_folded, item_type) VALUES (?, ?, ?)",
    )
    .bind(&item.title)
    .bind(fold_title(&item.title))
    .bind(&item.item_type)
    .execute(pool)
    .await
    .context("Failed to insert content item")?;

    Ok(result.last_insert_rowid())
}

/// Get a content item by ID.
pub async fn get_content_item(pool: &SqlitePool, id: i64) -> Result<Option<ContentItem>> {
    sqlx::query_as("SELECT * FROM content_items WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch content item")
}

/// Find the first item of a type whose title matches exactly, ignoring case.
///
/// Compares against `title_folded`, so non-ASCII letters fold too.
pub async fn find_item_id_by_title_and_type(
    pool: &SqlitePool,
    title: &str,
    item_type: &str,
) -> Result<Option<i64>> {
    sqlx::query_scalar(
        r"
        SELECT id FROM content_items
        WHERE item_type = ? AND title_folded = ?
        ORDER BY id
        LIMIT 1
        ",
    )
    .bind(item_type)
    .bind(fold_title(title))
    .fetch_optional(pool)
    .await
    .context("Failed to look up content item by title")
}

// ========== Item Metadata ==========

/// Get the IDs of all items carrying `key = value`.
pub async fn find_item_ids_by_meta(pool: &SqlitePool, key: &str, value: &str) -> Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT item_id FROM item_meta WHERE meta_key = ? AND meta_value = ? ORDER BY item_id",
    )
    .bind(key)
    .bind(value)
    .fetch_all(pool)
    .await
    .context("Failed to look up items by metadata")
}

/// Get a single metadata value for an item.
pub async fn get_item_meta(pool: &SqlitePool, item_id: i64, key: &str) -> Result<Option<String>> {
    sqlx::query_scalar("SELECT meta_value FROM item_meta WHERE item_id = ? AND meta_key = ?")
        .bind(item_id)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch item metadata")
}

/// Get every metadata entry for an item.
pub async fn get_all_item_meta(pool: &SqlitePool, item_id: i64) -> Result<Vec<ItemMeta>> {
    sqlx::query_as("SELECT * FROM item_meta WHERE item_id = ? ORDER BY meta_key")
        .bind(item_id)
        .fetch_all(pool)
        .await
        .context("Failed to fetch item metadata")
}

/// Insert or overwrite a metadata value.
pub async fn set_item_meta(pool: &SqlitePool, item_id: i64, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO item_meta (item_id, meta_key, meta_value)
        VALUES (?, ?, ?)
        ON CONFLICT(item_id, meta_key) DO UPDATE SET
            meta_value = excluded.meta_value,
            updated_at = datetime('now')
        ",
    )
    .bind(item_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .context("Failed to set item metadata")?;

    Ok(())
}

/// Store an integer value only if it is greater than the stored one.
///
/// Runs as a single conditional upsert, so concurrent callers can never
/// lower the value. A missing entry is always written; a non-numeric stored
/// value compares as zero.
/// Returns whether a row was written.
pub async fn raise_item_meta_int(
    pool: &SqlitePool,
    item_id: i64,
    key: &str,
    value: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r"
        INSERT INTO item_meta (item_id, meta_key, meta_value)
        VALUES (?, ?, ?)
        ON CONFLICT(item_id, meta_key) DO UPDATE SET
            meta_value = excluded.meta_value,
            updated_at = datetime('now')
        WHERE CAST(item_meta.meta_value AS INTEGER) < CAST(excluded.meta_value AS INTEGER)
        ",
    )
    .bind(item_id)
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await
    .context("Failed to raise item metadata")?;

    Ok(result.rows_affected() > 0)
}
