//! Notification domain - a dumb per-user inbox.
//!
//! The router creates, lists, flips, and removes entries; it never
//! deduplicates. Dedup belongs to whoever decides to send (the membership
//! service scans the creator's inbox before creating a join request).

pub mod models;

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::{DomainError, DomainResult, NotificationId, UserId};
use crate::kernel::store::paths;
use crate::kernel::CoreDeps;
use models::{Notification, NotificationPayload};

pub struct NotificationRouter {
    deps: CoreDeps,
}

impl NotificationRouter {
    pub fn new(deps: CoreDeps) -> Self {
        Self { deps }
    }

    /// Deliver a payload to a user's inbox, stamped unread at the server
    /// timestamp. Returns the assigned id.
    pub async fn create(
        &self,
        target: &UserId,
        payload: NotificationPayload,
    ) -> DomainResult<NotificationId> {
        let notification = Notification {
            payload,
            created_at: self.deps.store.now(),
            read: false,
        };
        let key = self
            .deps
            .store
            .append(
                &paths::notifications(target),
                serde_json::to_value(&notification)?,
            )
            .await?;
        debug!(target = %target, notification_id = %key, "notification delivered");
        Ok(NotificationId::from_key(key))
    }

    pub async fn get(
        &self,
        target: &UserId,
        notification_id: &NotificationId,
    ) -> DomainResult<Notification> {
        let value = self
            .deps
            .store
            .read(&paths::notification(target, notification_id))
            .await?
            .ok_or(DomainError::NotFound("notification"))?;
        Ok(serde_json::from_value(value)?)
    }

    /// The user's inbox, newest first.
    pub async fn list(&self, target: &UserId) -> DomainResult<Vec<(NotificationId, Notification)>> {
        let Some(value) = self.deps.store.read(&paths::notifications(target)).await? else {
            return Ok(Vec::new());
        };
        let inbox: BTreeMap<String, Notification> = serde_json::from_value(value)?;
        let mut entries: Vec<(NotificationId, Notification)> = inbox
            .into_iter()
            .map(|(key, notification)| (NotificationId::from_key(key), notification))
            .collect();
        entries.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(entries)
    }

    /// Flip the read flag. Marking an already-read entry is a no-op.
    pub async fn mark_read(
        &self,
        target: &UserId,
        notification_id: &NotificationId,
    ) -> DomainResult<()> {
        let notification = self.get(target, notification_id).await?;
        if notification.read {
            return Ok(());
        }
        self.deps
            .store
            .write(
                &format!("{}/read", paths::notification(target, notification_id)),
                serde_json::Value::Bool(true),
            )
            .await?;
        Ok(())
    }

    /// Drop an entry, consumed join requests included.
    pub async fn remove(
        &self,
        target: &UserId,
        notification_id: &NotificationId,
    ) -> DomainResult<()> {
        self.deps
            .store
            .remove(&paths::notification(target, notification_id))
            .await?;
        Ok(())
    }

    /// Whether any entry is unread, for badge indicators. No special
    /// casing by payload kind.
    pub async fn has_unread(&self, target: &UserId) -> DomainResult<bool> {
        Ok(self
            .list(target)
            .await?
            .iter()
            .any(|(_, notification)| !notification.read))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::GroupId;
    use models::RequestStatus;

    fn removal(group: &str) -> NotificationPayload {
        NotificationPayload::GroupRemoval {
            group_id: GroupId::from_key(group),
            group_name: group.to_string(),
        }
    }

    #[tokio::test]
    async fn inbox_lists_newest_first() {
        let deps = CoreDeps::in_memory();
        let router = NotificationRouter::new(deps);
        let user = UserId::from_key("u1");

        let first = router.create(&user, removal("a")).await.unwrap();
        let second = router.create(&user, removal("b")).await.unwrap();

        let inbox = router.list(&user).await.unwrap();
        assert_eq!(inbox.len(), 2);
        // Same server timestamp is possible; key order breaks the tie in
        // insertion order, so just check both are present and the read
        // flags start false.
        assert!(inbox.iter().any(|(id, _)| *id == first));
        assert!(inbox.iter().any(|(id, _)| *id == second));
        assert!(inbox.iter().all(|(_, n)| !n.read));
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let deps = CoreDeps::in_memory();
        let router = NotificationRouter::new(deps);
        let user = UserId::from_key("u1");

        let id = router.create(&user, removal("a")).await.unwrap();
        assert!(router.has_unread(&user).await.unwrap());

        router.mark_read(&user, &id).await.unwrap();
        router.mark_read(&user, &id).await.unwrap();

        assert!(router.get(&user, &id).await.unwrap().read);
        assert!(!router.has_unread(&user).await.unwrap());
    }

    #[tokio::test]
    async fn remove_consumes_the_entry() {
        let deps = CoreDeps::in_memory();
        let router = NotificationRouter::new(deps);
        let user = UserId::from_key("u1");

        let id = router.create(&user, removal("a")).await.unwrap();
        router.remove(&user, &id).await.unwrap();

        assert!(matches!(
            router.get(&user, &id).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(router.list(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn payload_round_trips_with_type_tag() {
        let deps = CoreDeps::in_memory();
        let router = NotificationRouter::new(deps.clone());
        let user = UserId::from_key("creator");

        let payload = NotificationPayload::JoinRequest {
            group_id: GroupId::from_key("g1"),
            group_name: "The Flat".to_string(),
            requester_id: UserId::from_key("newbie"),
            requester_name: "nat".to_string(),
            status: RequestStatus::Pending,
        };
        let id = router.create(&user, payload.clone()).await.unwrap();

        let stored = router.get(&user, &id).await.unwrap();
        assert_eq!(stored.payload, payload);

        let raw = deps
            .store
            .read(&paths::notification(&user, &id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw.get("type").and_then(|v| v.as_str()), Some("join_request"));
        assert_eq!(raw.get("status").and_then(|v| v.as_str()), Some("pending"));
    }
}
