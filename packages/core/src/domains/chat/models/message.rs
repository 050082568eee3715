use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::UserId;
use crate::domains::polls::models::Poll;

/// A message in a group's stream, stored at
/// `groups/{groupId}/messages/{messageId}`.
///
/// Polls and elections share the stream with plain text; the `type` tag
/// keeps the three shapes apart on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text(TextMessage),
    Poll(Poll),
    Election(Poll),
}

impl Message {
    /// Timestamp used for stream ordering.
    pub fn sent_at(&self) -> DateTime<Utc> {
        match self {
            Message::Text(text) => text.timestamp,
            Message::Poll(poll) | Message::Election(poll) => poll.created_at,
        }
    }
}

/// Plain text message. Append-only; `read` maps user keys to read receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub sender_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: BTreeMap<String, bool>,
}
