//! Membership domain - join requests, decisions, and removals.
//!
//! Join flow: a requester redeems an invite code, which puts a pending
//! join request in the creator's inbox (and a receipt in their own). The
//! creator resolves it; acceptance seeds membership and starting balance
//! and consumes the pending request in one atomic update, so the
//! duplicate-pending check stays sound even if follow-up notifications
//! fail to deliver.

use serde_json::Value;
use tracing::{info, warn};

use crate::common::{
    Actor, DomainError, DomainResult, GroupCapability, GroupId, NotificationId, UserId,
    UserProfile,
};
use crate::domains::groups::models::{Group, Membership, Role};
use crate::domains::groups::GroupStore;
use crate::domains::notifications::models::{NotificationPayload, RequestStatus};
use crate::domains::notifications::NotificationRouter;
use crate::kernel::store::paths;
use crate::kernel::CoreDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    Accept,
    Reject,
}

pub struct MembershipService {
    deps: CoreDeps,
    groups: GroupStore,
    notifications: NotificationRouter,
}

impl MembershipService {
    pub fn new(deps: CoreDeps) -> Self {
        Self {
            groups: GroupStore::new(deps.clone()),
            notifications: NotificationRouter::new(deps.clone()),
            deps,
        }
    }

    /// Redeem an invite code: file a pending join request with the group's
    /// creator and a receipt in the requester's own inbox.
    pub async fn request_join(&self, actor: &Actor, invite_code: &str) -> DomainResult<GroupId> {
        let invite_code = invite_code.trim();
        if invite_code.len() != 5 || !invite_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidArgument(
                "invite code must be 5 digits".to_string(),
            ));
        }

        let (group_id, group) = self
            .find_by_invite_code(invite_code)
            .await?
            .ok_or(DomainError::NotFound("group"))?;

        let members = self.groups.members(&group_id).await?;
        if members.contains_key(actor.user_id().as_str()) {
            return Err(DomainError::AlreadyMember);
        }
        if self
            .has_pending_request(&group.creator_id, &group_id, actor.user_id())
            .await?
        {
            return Err(DomainError::DuplicatePending);
        }

        let profile = UserProfile::load(self.deps.store.as_ref(), actor.user_id()).await?;
        self.notifications
            .create(
                &group.creator_id,
                NotificationPayload::JoinRequest {
                    group_id: group_id.clone(),
                    group_name: group.group_name.clone(),
                    requester_id: actor.user_id().clone(),
                    requester_name: profile.username,
                    status: RequestStatus::Pending,
                },
            )
            .await?;
        self.notifications
            .create(
                actor.user_id(),
                NotificationPayload::JoinRequestSent {
                    group_id: group_id.clone(),
                    group_name: group.group_name,
                    status: RequestStatus::Pending,
                },
            )
            .await?;

        info!(group_id = %group_id, requester = %actor.user_id(), "join request filed");
        Ok(group_id)
    }

    /// Decide a pending join request sitting in the actor's inbox.
    ///
    /// Acceptance writes membership, starting balance, and the removal of
    /// the pending request as one update. The follow-up notifications to
    /// both sides are delivered after that; losing them is a tolerable
    /// degraded state, leaving the pending request behind is not.
    pub async fn resolve_join_request(
        &self,
        actor: &Actor,
        notification_id: &NotificationId,
        decision: JoinDecision,
    ) -> DomainResult<()> {
        let pending = self.notifications.get(actor.user_id(), notification_id).await?;
        let NotificationPayload::JoinRequest {
            group_id,
            group_name,
            requester_id,
            requester_name,
            status: RequestStatus::Pending,
        } = pending.payload
        else {
            return Err(DomainError::InvalidArgument(
                "notification is not a pending join request".to_string(),
            ));
        };

        let group = self.groups.group(&group_id).await?;
        actor.can(GroupCapability::ResolveJoinRequests).check(&group)?;

        let pending_path = paths::notification(actor.user_id(), notification_id);
        let status = match decision {
            JoinDecision::Accept => {
                let membership = Membership {
                    name: requester_name.clone(),
                    joined_at: self.deps.store.now(),
                    role: Role::Member,
                };
                self.deps
                    .store
                    .update(vec![
                        (
                            paths::member(&group_id, &requester_id),
                            serde_json::to_value(&membership)?,
                        ),
                        (
                            paths::member_points(&group_id, &requester_id),
                            Value::from(group.initial_points),
                        ),
                        (pending_path, Value::Null),
                    ])
                    .await?;
                RequestStatus::Accepted
            }
            JoinDecision::Reject => {
                self.deps
                    .store
                    .update(vec![(pending_path, Value::Null)])
                    .await?;
                RequestStatus::Rejected
            }
        };

        self.notifications
            .create(
                &requester_id,
                NotificationPayload::JoinRequestResponse {
                    group_id: group_id.clone(),
                    group_name: group_name.clone(),
                    status,
                },
            )
            .await?;
        self.notifications
            .create(
                actor.user_id(),
                NotificationPayload::JoinRequestAction {
                    group_id: group_id.clone(),
                    group_name,
                    requester_name,
                    status,
                },
            )
            .await?;

        info!(group_id = %group_id, requester = %requester_id, ?decision, "join request resolved");
        Ok(())
    }

    /// Creator-only removal. The creator cannot remove themself through
    /// this path; that role transfer belongs to elections.
    pub async fn remove_member(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        member_id: &UserId,
    ) -> DomainResult<()> {
        let group = self.groups.group(group_id).await?;
        actor.can(GroupCapability::RemoveMembers).check(&group)?;
        if member_id == &group.creator_id {
            return Err(DomainError::InvalidTarget("the creator cannot be removed"));
        }
        let members = self.groups.members(group_id).await?;
        if !members.contains_key(member_id.as_str()) {
            return Err(DomainError::NotFound("member"));
        }

        self.deps
            .store
            .update(vec![
                (paths::member(group_id, member_id), Value::Null),
                (paths::member_points(group_id, member_id), Value::Null),
            ])
            .await?;

        if let Err(err) = self
            .notifications
            .create(
                member_id,
                NotificationPayload::GroupRemoval {
                    group_id: group_id.clone(),
                    group_name: group.group_name,
                },
            )
            .await
        {
            warn!(group_id = %group_id, member = %member_id, error = %err, "removal notification undelivered");
        }

        info!(group_id = %group_id, member = %member_id, "member removed");
        Ok(())
    }

    async fn find_by_invite_code(&self, code: &str) -> DomainResult<Option<(GroupId, Group)>> {
        let Some(all) = self.deps.store.read(paths::GROUPS).await? else {
            return Ok(None);
        };
        let Value::Object(all) = all else {
            return Ok(None);
        };
        for (key, value) in all {
            let group: Group = serde_json::from_value(value)?;
            if group.invite_code == code {
                return Ok(Some((GroupId::from_key(key), group)));
            }
        }
        Ok(None)
    }

    /// Scan the creator's inbox for an unresolved request from this
    /// requester for this group.
    async fn has_pending_request(
        &self,
        creator_id: &UserId,
        group_id: &GroupId,
        requester: &UserId,
    ) -> DomainResult<bool> {
        let inbox = self.notifications.list(creator_id).await?;
        Ok(inbox.iter().any(|(_, notification)| {
            matches!(
                &notification.payload,
                NotificationPayload::JoinRequest {
                    group_id: pending_group,
                    requester_id,
                    status: RequestStatus::Pending,
                    ..
                } if pending_group == group_id && requester_id == requester
            )
        }))
    }
}
