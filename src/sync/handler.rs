use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::hooks::{SyncHooks, TitleMatchAttempt};
use super::payload::{SkipReason, WebhookEvent};
use super::{MetadataStore, SyncSettings};
use crate::db::{META_COMMENT_COUNT, META_EXTERNAL_TOPIC_ID, META_NEEDS_COMMENT_REFRESH};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// How an item was linked to the webhook's topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    /// The item already stored the topic id.
    TopicId,
    /// The item was found by title and has now been linked.
    Title,
}

/// Changes made to one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub item_id: i64,
    pub matched_by: MatchedBy,
    /// Whether `comment_count` was written. Always true when the payload
    /// carried `topic_posts_count`.
    pub comment_count_written: bool,
}

/// Result of handling one webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The payload did not describe a topic post; nothing was touched.
    Skipped(SkipReason),
    /// No content item is linked to the topic.
    Unmatched { topic_id: i64 },
    Synced {
        topic_id: i64,
        updates: Vec<ItemUpdate>,
    },
}

/// Applies Discourse post webhooks to content item metadata.
#[derive(Debug)]
pub struct TopicSyncHandler<S> {
    store: S,
    settings: SyncSettings,
    hooks: SyncHooks,
}

impl<S: MetadataStore> TopicSyncHandler<S> {
    #[must_use]
    pub fn new(store: S, settings: SyncSettings, hooks: SyncHooks) -> Self {
        Self {
            store,
            settings,
            hooks,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle an authenticated webhook body.
    ///
    /// Payloads that are not usable topic posts are skipped without touching
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns an error only if the metadata store fails.
    pub async fn handle(&self, body: &[u8]) -> Result<SyncOutcome, SyncError> {
        let Ok(raw) = serde_json::from_slice::<Value>(body) else {
            debug!("Skipping webhook: body is not JSON");
            return Ok(SyncOutcome::Skipped(SkipReason::InvalidJson));
        };

        self.handle_payload(&raw).await
    }

    /// Handle an already parsed webhook body.
    ///
    /// # Errors
    ///
    /// Returns an error only if the metadata store fails.
    pub async fn handle_payload(&self, raw: &Value) -> Result<SyncOutcome, SyncError> {
        self.hooks.notify_before_sync(raw);

        match WebhookEvent::from_payload(raw) {
            Ok(event) => self.sync_event(&event).await,
            Err(reason) => {
                debug!(reason = reason.as_str(), "Skipping webhook");
                Ok(SyncOutcome::Skipped(reason))
            }
        }
    }

    /// Apply a validated event to every content item linked to its topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata store fails.
    pub async fn sync_event(&self, event: &WebhookEvent) -> Result<SyncOutcome, SyncError> {
        let topic_id = event.topic_id;
        let mut matches: Vec<(i64, MatchedBy)> = self
            .store
            .find_by_meta(META_EXTERNAL_TOPIC_ID, &topic_id.to_string())
            .await?
            .into_iter()
            .map(|id| (id, MatchedBy::TopicId))
            .collect();

        if matches.is_empty() && self.settings.match_old_topics_by_title {
            if let Some(item_id) = self.match_by_title(event).await? {
                matches.push((item_id, MatchedBy::Title));
            }
        }

        if matches.is_empty() {
            debug!(topic_id, "No content items linked to topic");
            return Ok(SyncOutcome::Unmatched { topic_id });
        }

        let comments_count = event.comments_count();
        let mut updates = Vec::with_capacity(matches.len());

        for (item_id, matched_by) in matches {
            self.store
                .set_meta(item_id, META_NEEDS_COMMENT_REFRESH, "1")
                .await?;

            let comment_count_written = match comments_count {
                Some(count) => {
                    self.store
                        .set_meta(item_id, META_COMMENT_COUNT, &count.to_string())
                        .await?;
                    true
                }
                // Older payloads lack topic_posts_count; only ever move the count up.
                None => {
                    self.store
                        .raise_meta_int(item_id, META_COMMENT_COUNT, event.implied_comments_count())
                        .await?
                }
            };

            debug!(
                topic_id,
                item_id,
                comment_count_written,
                "Flagged content item for comment refresh"
            );

            updates.push(ItemUpdate {
                item_id,
                matched_by,
                comment_count_written,
            });
        }

        info!(
            topic_id,
            post_number = event.post_number,
            items = updates.len(),
            "Synced topic to content items"
        );

        Ok(SyncOutcome::Synced { topic_id, updates })
    }

    /// Find an item by title and point its topic id at the event's topic.
    ///
    /// Only runs when no item carries the topic id; an item found here is
    /// relinked even if it was previously linked to another topic.
    async fn match_by_title(&self, event: &WebhookEvent) -> Result<Option<i64>, SyncError> {
        let item_type = self
            .hooks
            .filter_title_match_item_type(&self.settings.title_match_item_type);

        let matched = self
            .store
            .find_by_title_and_type(&event.topic_title, &item_type)
            .await?;

        if let Some(item_id) = matched {
            self.store
                .set_meta(item_id, META_EXTERNAL_TOPIC_ID, &event.topic_id.to_string())
                .await?;
            info!(
                topic_id = event.topic_id,
                item_id,
                item_type = %item_type,
                "Linked content item to topic by title"
            );
        }

        self.hooks.notify_title_match(&TitleMatchAttempt {
            title: &event.topic_title,
            item_type: &item_type,
            matched_item: matched,
        });

        Ok(matched)
    }
}
