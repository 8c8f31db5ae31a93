mod migrations;
mod models;
mod queries;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::sync::MetadataStore;

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection, running migrations if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub async fn new(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Concurrent webhook deliveries serialize on the SQLite write lock.
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let db = Self { pool };
        db.run_migrations().await?;
        db.verify_writable(path).await?;

        Ok(db)
    }

    async fn verify_writable(&self, path: &Path) -> Result<()> {
        // Starting a transaction requires write capability on SQLite, so a
        // read-only volume mount fails here instead of on the first webhook.
        let tx = self.pool.begin().await.with_context(|| {
            format!(
                "SQLite database is not writable (path: {}). Check volume mount permissions/ownership",
                path.display()
            )
        })?;

        tx.commit()
            .await
            .context("Failed to commit SQLite writability check")?;
        Ok(())
    }

    /// Run all pending migrations.
    async fn run_migrations(&self) -> Result<()> {
        migrations::run(&self.pool).await?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for Database {
    async fn find_by_meta(&self, key: &str, value: &str) -> Result<Vec<i64>> {
        find_item_ids_by_meta(&self.pool, key, value).await
    }

    async fn find_by_title_and_type(&self, title: &str, item_type: &str) -> Result<Option<i64>> {
        find_item_id_by_title_and_type(&self.pool, title, item_type).await
    }

    async fn get_meta(&self, item_id: i64, key: &str) -> Result<Option<String>> {
        get_item_meta(&self.pool, item_id, key).await
    }

    async fn set_meta(&self, item_id: i64, key: &str, value: &str) -> Result<()> {
        set_item_meta(&self.pool, item_id, key, value).await
    }

    async fn raise_meta_int(&self, item_id: i64, key: &str, value: i64) -> Result<bool> {
        raise_item_meta_int(&self.pool, item_id, key, value).await
    }
}
