use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

use super::queries::fold_title;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    if current_version < 3 {
        debug!("Running migration v3");
        run_migration_v3(pool).await?;
        set_schema_version(pool, 3).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: content items and metadata");

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS content_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            item_type TEXT NOT NULL DEFAULT 'post',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create content_items table")?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS item_meta (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
            meta_key TEXT NOT NULL,
            meta_value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(item_id, meta_key)
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create item_meta table")?;

    Ok(())
}

async fn run_migration_v2(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v2: lookup indexes");

    // Topic id lookups scan by key and value.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_item_meta_key_value ON item_meta(meta_key, meta_value)")
        .execute(pool)
        .await
        .context("Failed to create item_meta key/value index")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_items_type_title ON content_items(item_type, title COLLATE NOCASE)",
    )
    .execute(pool)
    .await
    .context("Failed to create content_items title index")?;

    Ok(())
}

async fn run_migration_v3(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v3: unicode case-folded titles");

    // NOCASE only folds ASCII, so titles are folded in Rust and stored.
    sqlx::query("ALTER TABLE content_items ADD COLUMN title_folded TEXT NOT NULL DEFAULT ''")
        .execute(pool)
        .await
        .context("Failed to add title_folded column")?;

    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, title FROM content_items")
        .fetch_all(pool)
        .await
        .context("Failed to read titles for folding")?;

    for (id, title) in rows {
        sqlx::query("UPDATE content_items SET title_folded = ? WHERE id = ?")
            .bind(fold_title(&title))
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to backfill title_folded")?;
    }

    sqlx::query("DROP INDEX IF EXISTS idx_content_items_type_title")
        .execute(pool)
        .await
        .context("Failed to drop content_items title index")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_items_type_title_folded ON content_items(item_type, title_folded)",
    )
    .execute(pool)
    .await
    .context("Failed to create content_items folded title index")?;

    Ok(())
}
