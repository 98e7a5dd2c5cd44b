//! Feed data types.
//!
//! Records returned by the API are kept as raw JSON; the monitor only needs a
//! thin projection of each one (creation time, a few discriminator fields).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::SharedClient;

/// Timestamp layout used by the platform outside of RFC 3339.
const PLATFORM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifier of a feed item: its creation time in milliseconds since epoch.
pub type ContentId = i64;

/// Which diff strategy a registration uses.
///
/// Ordering of the variants is the order in which buckets are polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Links, entries and comments (`items`, newest-first).
    Content,
    /// Personal notifications, optionally filtered by type.
    Notification,
    /// The list of private-message conversations.
    PrivateMessageList,
    /// Messages of one conversation (`messages`, oldest-first).
    ConversationMessages,
}

impl FeedKind {
    /// Get display name for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Notification => "notification",
            Self::PrivateMessageList => "pm",
            Self::ConversationMessages => "conversation",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification types known to the platform.
pub struct NotificationType;

impl NotificationType {
    pub const NEW_LINK: &'static str = "new_link";
    pub const NEW_COMMENT_IN_LINK: &'static str = "new_comment_in_link";
    pub const NEW_ENTRY: &'static str = "new_entry";
    pub const NEW_COMMENT_IN_ENTRY: &'static str = "new_comment_in_entry";
    pub const NEW_FOLLOWER: &'static str = "new_follower";
    pub const LINK_IN_UPCOMING: &'static str = "link_in_upcoming";
    pub const LINK_ON_HOMEPAGE: &'static str = "link_on_homepage";
    pub const LINK_WAS_BURIED: &'static str = "link_was_buried";
    pub const MODERATION_ACTION: &'static str = "moderation_action";
    pub const NEW_BADGE: &'static str = "new_badge";
    pub const SYSTEM: &'static str = "system";
    pub const NEW_ISSUE_RESPONSE: &'static str = "new_issue_response";

    /// Every notification type, in the platform's order.
    pub const ALL: [&'static str; 12] = [
        Self::NEW_LINK,
        Self::NEW_COMMENT_IN_LINK,
        Self::NEW_ENTRY,
        Self::NEW_COMMENT_IN_ENTRY,
        Self::NEW_FOLLOWER,
        Self::LINK_IN_UPCOMING,
        Self::LINK_ON_HOMEPAGE,
        Self::LINK_WAS_BURIED,
        Self::MODERATION_ACTION,
        Self::NEW_BADGE,
        Self::SYSTEM,
        Self::NEW_ISSUE_RESPONSE,
    ];
}

/// A single record from a feed (link, entry, comment, notification,
/// conversation or message).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Value);

impl Item {
    /// Wrap a raw JSON record.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the raw record.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Look up a top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Look up a top-level string field.
    #[must_use]
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// When the record was created.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.str_field("created_at").and_then(parse_timestamp)
    }

    /// The record's identifier (creation time in milliseconds).
    #[must_use]
    pub fn content_id(&self) -> Option<ContentId> {
        self.created_at().map(|t| t.timestamp_millis())
    }

    /// The `type` field of a notification.
    #[must_use]
    pub fn notification_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// The last message of a conversation record.
    #[must_use]
    pub fn last_message(&self) -> Option<Item> {
        self.get("last_message").cloned().map(Item)
    }

    /// Whether a message was written by the logged-in user (`type == 0`).
    #[must_use]
    pub fn is_self_authored(&self) -> bool {
        self.get("type").and_then(Value::as_i64) == Some(0)
    }

    /// Classify a content record.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match self.str_field("resource") {
            Some("link") => ContentType::Link,
            Some("entry") => ContentType::Entry,
            Some("link_comment" | "entry_comment") => ContentType::Comment,
            _ if self.get("title").is_some() => ContentType::Link,
            _ => ContentType::Entry,
        }
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Parse an RFC 3339 or `YYYY-MM-DD HH:MM:SS` (read as UTC) timestamp.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, PLATFORM_TIME_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// Kind of content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Link,
    Entry,
    Comment,
}

/// Raw response of one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedResult {
    /// List feeds, newest-first.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Conversation messages, oldest-first.
    #[serde(default)]
    pub messages: Vec<Item>,
    /// Remaining fields of the response (e.g. the conversation's user).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeedResult {
    /// Build an `items`-shaped result.
    #[must_use]
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Build a `messages`-shaped result.
    #[must_use]
    pub fn with_messages(messages: Vec<Item>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

/// What a callback receives for one new item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Link(Item),
    Entry(Item),
    Comment(Item),
    Notification(Item),
    Conversation(Item),
    Message {
        message: Item,
        conversation: FeedResult,
    },
}

impl Payload {
    /// The item this payload is about.
    #[must_use]
    pub fn item(&self) -> &Item {
        match self {
            Self::Link(item)
            | Self::Entry(item)
            | Self::Comment(item)
            | Self::Notification(item)
            | Self::Conversation(item)
            | Self::Message { message: item, .. } => item,
        }
    }
}

/// A delivered event: the new item plus the shared client handle.
#[derive(Clone)]
pub struct Event {
    pub payload: Payload,
    pub client: SharedClient,
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_id_platform_format() {
        let item = Item::new(json!({ "created_at": "2023-05-12 10:00:00" }));
        let expected = "2023-05-12T10:00:00Z"
            .parse::<DateTime<Utc>>()
            .unwrap()
            .timestamp_millis();
        assert_eq!(item.content_id(), Some(expected));
    }

    #[test]
    fn test_content_id_rfc3339() {
        let item = Item::new(json!({ "created_at": "2023-05-12T12:00:00+02:00" }));
        let other = Item::new(json!({ "created_at": "2023-05-12 10:00:00" }));
        assert_eq!(item.content_id(), other.content_id());
    }

    #[test]
    fn test_content_id_missing_or_invalid() {
        assert_eq!(Item::new(json!({})).content_id(), None);
        assert_eq!(Item::new(json!({ "created_at": "yesterday" })).content_id(), None);
        assert_eq!(Item::new(json!({ "created_at": 17 })).content_id(), None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(Item::new(json!({ "title": "x" })).content_type(), ContentType::Link);
        assert_eq!(Item::new(json!({ "content": "x" })).content_type(), ContentType::Entry);
        assert_eq!(
            Item::new(json!({ "resource": "entry_comment", "title": "x" })).content_type(),
            ContentType::Comment
        );
        assert_eq!(
            Item::new(json!({ "resource": "entry", "title": "x" })).content_type(),
            ContentType::Entry
        );
    }

    #[test]
    fn test_self_authored() {
        assert!(Item::new(json!({ "type": 0 })).is_self_authored());
        assert!(!Item::new(json!({ "type": 1 })).is_self_authored());
        assert!(!Item::new(json!({})).is_self_authored());
    }

    #[test]
    fn test_feed_result_keeps_extra_fields() {
        let result: FeedResult = serde_json::from_value(json!({
            "messages": [{ "created_at": "2023-01-01 00:00:00" }],
            "user": { "username": "alice" }
        }))
        .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.extra["user"]["username"], "alice");
    }

    #[test]
    fn test_payload_serializes_tagged() {
        let payload = Payload::Link(Item::new(json!({ "id": 1 })));
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({ "link": { "id": 1 } }));
    }
}
