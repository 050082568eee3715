//! The external realtime store contract.
//!
//! The durable store is external to this crate (the app shell wires in the
//! real backend). This module defines the minimal interface the domain
//! services need: path-addressed reads and writes, push-style appends with
//! server-generated keys, a multi-path update that is atomic within one
//! call, compare-and-swap for contended values, and subscriptions that
//! deliver the current value immediately and then every change.
//!
//! Paths follow the original store layout so existing data stays readable:
//!
//! ```text
//! groups/{groupId}
//! groups/{groupId}/members/{uid}
//! groups/{groupId}/memberPoints/{uid}
//! groups/{groupId}/history/{entryId}
//! groups/{groupId}/rules/{ruleId}
//! groups/{groupId}/messages/{messageId}
//! notifications/{uid}/{notificationId}
//! users/{uid}
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// Store-level failures. Transient outages and timeouts all surface as
/// `Unavailable`; retry policy belongs to the caller.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A change delivered to subscribers: the path that changed and its new
/// value (`None` when the path was removed).
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub path: String,
    pub value: Option<Value>,
}

/// An active subscription: the value at subscribe time plus a stream of
/// subsequent changes anywhere under the subscribed path.
pub struct Subscription {
    pub snapshot: Option<Value>,
    pub events: broadcast::Receiver<StoreEvent>,
}

/// Minimal contract for the external durable store.
///
/// Writes issued by one actor are observed by that actor's own
/// subscriptions in issue order, but no ordering across actors is
/// guaranteed. `update` is transactional across its paths within one call,
/// never across calls.
#[async_trait]
pub trait BaseStore: Send + Sync {
    /// Read the value at a path, assembling children into an object.
    /// Returns `None` when nothing exists there.
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite the value at a path. `Value::Null` removes the path.
    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Apply several path writes as one atomic unit. `Value::Null` entries
    /// remove their path.
    async fn update(&self, changes: Vec<(String, Value)>) -> Result<(), StoreError>;

    /// Insert a value under a collection path with a server-generated,
    /// monotonic-ish key. Returns the new key.
    async fn append(&self, collection: &str, value: Value) -> Result<String, StoreError>;

    /// Atomically replace the value at `path` with `new` if the current
    /// value equals `expected`. Returns whether the swap applied.
    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Value,
    ) -> Result<bool, StoreError>;

    /// Remove the path and everything beneath it.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Subscribe to changes at and beneath a path.
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError>;

    /// The server-assigned timestamp, resolved at write time.
    fn now(&self) -> DateTime<Utc>;
}

/// Canonical store paths for every entity this crate touches.
pub mod paths {
    use crate::common::entity_ids::{GroupId, MessageId, NotificationId, RuleId, UserId};

    pub const GROUPS: &str = "groups";

    pub fn group(group_id: &GroupId) -> String {
        format!("groups/{group_id}")
    }

    pub fn members(group_id: &GroupId) -> String {
        format!("groups/{group_id}/members")
    }

    pub fn member(group_id: &GroupId, user_id: &UserId) -> String {
        format!("groups/{group_id}/members/{user_id}")
    }

    pub fn points(group_id: &GroupId) -> String {
        format!("groups/{group_id}/memberPoints")
    }

    pub fn member_points(group_id: &GroupId, user_id: &UserId) -> String {
        format!("groups/{group_id}/memberPoints/{user_id}")
    }

    pub fn history(group_id: &GroupId) -> String {
        format!("groups/{group_id}/history")
    }

    pub fn rules(group_id: &GroupId) -> String {
        format!("groups/{group_id}/rules")
    }

    pub fn rule(group_id: &GroupId, rule_id: &RuleId) -> String {
        format!("groups/{group_id}/rules/{rule_id}")
    }

    pub fn messages(group_id: &GroupId) -> String {
        format!("groups/{group_id}/messages")
    }

    pub fn message(group_id: &GroupId, message_id: &MessageId) -> String {
        format!("groups/{group_id}/messages/{message_id}")
    }

    pub fn vote(group_id: &GroupId, message_id: &MessageId, user_id: &UserId) -> String {
        format!("groups/{group_id}/messages/{message_id}/votes/{user_id}")
    }

    pub fn message_resolved(group_id: &GroupId, message_id: &MessageId) -> String {
        format!("groups/{group_id}/messages/{message_id}/resolved")
    }

    pub fn message_read(group_id: &GroupId, message_id: &MessageId, user_id: &UserId) -> String {
        format!("groups/{group_id}/messages/{message_id}/read/{user_id}")
    }

    pub fn notifications(user_id: &UserId) -> String {
        format!("notifications/{user_id}")
    }

    pub fn notification(user_id: &UserId, notification_id: &NotificationId) -> String {
        format!("notifications/{user_id}/{notification_id}")
    }

    pub fn user(user_id: &UserId) -> String {
        format!("users/{user_id}")
    }
}
