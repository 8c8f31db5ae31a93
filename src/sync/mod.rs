//! Topic-to-content reconciliation.
//!
//! A Discourse post webhook names a topic; this module finds the content
//! items linked to that topic and refreshes their cached comment metadata.

mod handler;
mod hooks;
mod payload;

pub use handler::{ItemUpdate, MatchedBy, SyncError, SyncOutcome, TopicSyncHandler};
pub use hooks::{SyncHooks, SyncObserver, TitleMatchAttempt};
pub use payload::{SkipReason, WebhookEvent};

use anyhow::Result;
use async_trait::async_trait;

/// Per-request settings for the sync handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Fall back to a title lookup when no item carries the topic id.
    pub match_old_topics_by_title: bool,
    /// Item type searched by the title fallback, before hooks adjust it.
    pub title_match_item_type: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            match_old_topics_by_title: false,
            title_match_item_type: "post".to_string(),
        }
    }
}

/// Storage for content item metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// IDs of all items whose `key` metadata equals `value`.
    async fn find_by_meta(&self, key: &str, value: &str) -> Result<Vec<i64>>;

    /// First item of `item_type` whose title equals `title`, ignoring Unicode case.
    async fn find_by_title_and_type(&self, title: &str, item_type: &str) -> Result<Option<i64>>;

    async fn get_meta(&self, item_id: i64, key: &str) -> Result<Option<String>>;

    async fn set_meta(&self, item_id: i64, key: &str, value: &str) -> Result<()>;

    /// Write `value` only if it is greater than the stored integer (or
    /// nothing is stored). Must be atomic against concurrent writers.
    /// Returns whether the value was written.
    async fn raise_meta_int(&self, item_id: i64, key: &str, value: i64) -> Result<bool>;
}
