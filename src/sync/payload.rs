use serde::Deserialize;
use serde_json::Value;

/// Why a webhook payload was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The body is not JSON.
    InvalidJson,
    /// There is no `post` object.
    MissingPost,
    /// A `post` field has the wrong JSON type.
    MalformedPost,
    MissingTopicId,
    MissingPostNumber,
    MissingTopicTitle,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::MissingPost => "missing_post",
            Self::MalformedPost => "malformed_post",
            Self::MissingTopicId => "missing_topic_id",
            Self::MissingPostNumber => "missing_post_number",
            Self::MissingTopicTitle => "missing_topic_title",
        }
    }
}

/// The `post` object of a Discourse post webhook, as sent.
#[derive(Debug, Default, Deserialize)]
struct PostPayload {
    #[serde(default)]
    topic_id: Option<i64>,
    #[serde(default)]
    post_number: Option<i64>,
    #[serde(default)]
    topic_title: Option<String>,
    #[serde(default)]
    topic_posts_count: Option<i64>,
    #[serde(default)]
    post_type: Option<i64>,
}

/// A validated topic event extracted from a post webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub topic_id: i64,
    /// 1-based position of the post within its topic.
    pub post_number: i64,
    pub topic_title: String,
    /// Total posts in the topic, including the first one.
    pub topic_posts_count: Option<i64>,
    pub post_type: Option<i64>,
}

impl WebhookEvent {
    /// Extract an event from an already parsed webhook body.
    ///
    /// # Errors
    ///
    /// Returns the reason the payload should be skipped.
    pub fn from_payload(raw: &Value) -> Result<Self, SkipReason> {
        let post = raw
            .get("post")
            .filter(|p| p.is_object())
            .ok_or(SkipReason::MissingPost)?;
        let post = PostPayload::deserialize(post).map_err(|_| SkipReason::MalformedPost)?;

        let topic_id = post
            .topic_id
            .filter(|&id| id > 0)
            .ok_or(SkipReason::MissingTopicId)?;
        let post_number = post
            .post_number
            .filter(|&n| n > 0)
            .ok_or(SkipReason::MissingPostNumber)?;
        let topic_title = post
            .topic_title
            .filter(|t| !t.trim().is_empty())
            .ok_or(SkipReason::MissingTopicTitle)?;

        Ok(Self {
            topic_id,
            post_number,
            topic_title,
            topic_posts_count: post.topic_posts_count,
            post_type: post.post_type,
        })
    }

    /// Reply count reported by the forum, excluding the first post.
    ///
    /// `None` for payloads without a usable `topic_posts_count`.
    #[must_use]
    pub fn comments_count(&self) -> Option<i64> {
        self.topic_posts_count.filter(|&n| n >= 1).map(|n| n - 1)
    }

    /// Reply count implied by this post's position in the topic.
    #[must_use]
    pub fn implied_comments_count(&self) -> i64 {
        self.post_number - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_payload() {
        let raw = json!({
            "post": {
                "id": 991,
                "topic_id": 42,
                "post_number": 5,
                "topic_title": "Foo",
                "topic_posts_count": 5,
                "post_type": 1,
                "cooked": "<p>hi</p>"
            }
        });

        let event = WebhookEvent::from_payload(&raw).unwrap();
        assert_eq!(event.topic_id, 42);
        assert_eq!(event.post_number, 5);
        assert_eq!(event.topic_title, "Foo");
        assert_eq!(event.post_type, Some(1));
        assert_eq!(event.comments_count(), Some(4));
        assert_eq!(event.implied_comments_count(), 4);
    }

    #[test]
    fn test_older_payload_without_posts_count() {
        let raw = json!({"post": {"topic_id": 42, "post_number": 5, "topic_title": "Foo"}});

        let event = WebhookEvent::from_payload(&raw).unwrap();
        assert_eq!(event.topic_posts_count, None);
        assert_eq!(event.comments_count(), None);
    }

    #[test]
    fn test_zero_posts_count_is_ignored() {
        let raw = json!({"post": {"topic_id": 1, "post_number": 1, "topic_title": "T", "topic_posts_count": 0}});
        assert_eq!(WebhookEvent::from_payload(&raw).unwrap().comments_count(), None);
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            (json!({}), SkipReason::MissingPost),
            (json!({"post": "nope"}), SkipReason::MissingPost),
            (json!({"post": {"post_number": 5, "topic_title": "Foo"}}), SkipReason::MissingTopicId),
            (json!({"post": {"topic_id": 0, "post_number": 5, "topic_title": "Foo"}}), SkipReason::MissingTopicId),
            (json!({"post": {"topic_id": 42, "topic_title": "Foo"}}), SkipReason::MissingPostNumber),
            (json!({"post": {"topic_id": 42, "post_number": 5}}), SkipReason::MissingTopicTitle),
            (json!({"post": {"topic_id": 42, "post_number": 5, "topic_title": "  "}}), SkipReason::MissingTopicTitle),
            (json!({"post": {"topic_id": "42", "post_number": 5, "topic_title": "Foo"}}), SkipReason::MalformedPost),
        ];

        for (raw, expected) in cases {
            assert_eq!(WebhookEvent::from_payload(&raw), Err(expected), "payload: {raw}");
        }
    }

    #[test]
    fn test_null_fields_are_missing() {
        let raw = json!({"post": {"topic_id": 42, "post_number": 5, "topic_title": null}});
        assert_eq!(WebhookEvent::from_payload(&raw), Err(SkipReason::MissingTopicTitle));
    }
}
