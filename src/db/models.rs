use serde::{Deserialize, Serialize};

/// Metadata key holding the Discourse topic id an item is linked to.
pub const META_EXTERNAL_TOPIC_ID: &str = "external_topic_id";
/// Metadata key holding the cached number of forum replies.
pub const META_COMMENT_COUNT: &str = "comment_count";
/// Metadata key flagging that comments should be re-pulled from the forum.
pub const META_NEEDS_COMMENT_REFRESH: &str = "needs_comment_refresh";

/// A content item owned by the publishing system.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItem {
    pub id: i64,
    pub title: String,
    pub item_type: String,
    pub created_at: String,
}

/// A single metadata entry attached to a content item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemMeta {
    pub id: i64,
    pub item_id: i64,
    pub meta_key: String,
    pub meta_value: String,
    pub updated_at: String,
}

/// Data for inserting a new content item.
#[derive(Debug, Clone)]
pub struct NewContentItem {
    pub title: String,
    pub item_type: String,
}

impl NewContentItem {
    /// A new item of the default `post` type.
    #[must_use]
    pub fn post(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            item_type: "post".to_string(),
        }
    }
}
