//! Group domain - group records, membership projections, and rule management.
//!
//! `GroupStore` owns the read/subscribe projections the app shell renders
//! (a user's groups, a group's members) and the creator-gated rule CRUD.
//! Point balances are written only by the ledger; join and removal flows
//! live in the membership service.

pub mod models;

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::common::{Actor, DomainError, DomainResult, GroupCapability, GroupId, RuleId, UserId, UserProfile};
use crate::kernel::store::{paths, StoreEvent};
use crate::kernel::CoreDeps;
use models::{Group, Membership, Role, Rule};

const MAX_GROUP_NAME_LEN: usize = 30;

/// Read/subscribe projections of group state plus group and rule mutation.
pub struct GroupStore {
    deps: CoreDeps,
}

impl GroupStore {
    pub fn new(deps: CoreDeps) -> Self {
        Self { deps }
    }

    /// Create a group with the actor as creator.
    ///
    /// Seeds the creator's membership and starting balance in the same
    /// multi-path update that follows the group record write.
    pub async fn create_group(
        &self,
        actor: &Actor,
        group_name: &str,
        group_icon: &str,
        initial_points: i64,
    ) -> DomainResult<GroupId> {
        let group_name = group_name.trim();
        if group_name.is_empty() || group_name.len() > MAX_GROUP_NAME_LEN {
            return Err(DomainError::InvalidArgument(format!(
                "group name must be between 1 and {MAX_GROUP_NAME_LEN} characters"
            )));
        }
        if initial_points < 0 {
            return Err(DomainError::InvalidArgument(
                "initial points must be non-negative".to_string(),
            ));
        }

        let profile = UserProfile::load(self.deps.store.as_ref(), actor.user_id()).await?;
        let now = self.deps.store.now();
        let group = Group {
            group_name: group_name.to_string(),
            creator_id: actor.user_id().clone(),
            invite_code: generate_invite_code(),
            initial_points,
            group_icon: group_icon.to_string(),
            created_at: now,
        };

        let key = self
            .deps
            .store
            .append(paths::GROUPS, serde_json::to_value(&group)?)
            .await?;
        let group_id = GroupId::from_key(key);

        let membership = Membership {
            name: profile.username,
            joined_at: now,
            role: Role::Creator,
        };
        self.deps
            .store
            .update(vec![
                (
                    paths::member(&group_id, actor.user_id()),
                    serde_json::to_value(&membership)?,
                ),
                (
                    paths::member_points(&group_id, actor.user_id()),
                    Value::from(initial_points),
                ),
            ])
            .await?;

        info!(group_id = %group_id, creator = %actor.user_id(), "group created");
        Ok(group_id)
    }

    /// Load a group's record.
    pub async fn group(&self, group_id: &GroupId) -> DomainResult<Group> {
        let value = self
            .deps
            .store
            .read(&paths::group(group_id))
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load a group's membership map, keyed by raw user key.
    pub async fn members(&self, group_id: &GroupId) -> DomainResult<BTreeMap<String, Membership>> {
        let value = self
            .deps
            .store
            .read(&paths::members(group_id))
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        Ok(serde_json::from_value(value)?)
    }

    /// All groups the user belongs to.
    pub async fn groups_for_user(&self, user_id: &UserId) -> DomainResult<Vec<(GroupId, Group)>> {
        let Some(all) = self.deps.store.read(paths::GROUPS).await? else {
            return Ok(Vec::new());
        };
        let Value::Object(all) = all else {
            return Ok(Vec::new());
        };

        let mut groups = Vec::new();
        for (key, value) in all {
            let is_member = value
                .get("members")
                .and_then(|members| members.get(user_id.as_str()))
                .is_some();
            if is_member {
                groups.push((GroupId::from_key(key), serde_json::from_value(value)?));
            }
        }
        Ok(groups)
    }

    /// Current group record plus a stream of changes at or beneath the
    /// group's path.
    pub async fn subscribe_group(
        &self,
        group_id: &GroupId,
    ) -> DomainResult<(Option<Group>, broadcast::Receiver<StoreEvent>)> {
        let subscription = self.deps.store.subscribe(&paths::group(group_id)).await?;
        let snapshot = match subscription.snapshot {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        Ok((snapshot, subscription.events))
    }

    // ========================================================================
    // Rules (creator-only)
    // ========================================================================

    pub async fn add_rule(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        rule_name: &str,
        points: i64,
    ) -> DomainResult<RuleId> {
        let rule_name = rule_name.trim();
        if rule_name.is_empty() {
            return Err(DomainError::InvalidArgument(
                "rule name must not be empty".to_string(),
            ));
        }
        let group = self.group(group_id).await?;
        actor.can(GroupCapability::ManageRules).check(&group)?;

        let now = self.deps.store.now();
        let rule = Rule {
            rule_name: rule_name.to_string(),
            points,
            created_at: now,
            updated_at: now,
        };
        let key = self
            .deps
            .store
            .append(&paths::rules(group_id), serde_json::to_value(&rule)?)
            .await?;
        info!(group_id = %group_id, rule = rule_name, points, "rule added");
        Ok(RuleId::from_key(key))
    }

    pub async fn update_rule(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        rule_id: &RuleId,
        rule_name: &str,
        points: i64,
    ) -> DomainResult<()> {
        let rule_name = rule_name.trim();
        if rule_name.is_empty() {
            return Err(DomainError::InvalidArgument(
                "rule name must not be empty".to_string(),
            ));
        }
        let group = self.group(group_id).await?;
        actor.can(GroupCapability::ManageRules).check(&group)?;

        let path = paths::rule(group_id, rule_id);
        let existing = self
            .deps
            .store
            .read(&path)
            .await?
            .ok_or(DomainError::NotFound("rule"))?;
        let existing: Rule = serde_json::from_value(existing)?;

        let updated = Rule {
            rule_name: rule_name.to_string(),
            points,
            created_at: existing.created_at,
            updated_at: self.deps.store.now(),
        };
        self.deps
            .store
            .write(&path, serde_json::to_value(&updated)?)
            .await?;
        Ok(())
    }

    /// Hard delete; nothing is historized for rule changes.
    pub async fn delete_rule(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        rule_id: &RuleId,
    ) -> DomainResult<()> {
        let group = self.group(group_id).await?;
        actor.can(GroupCapability::ManageRules).check(&group)?;
        self.deps.store.remove(&paths::rule(group_id, rule_id)).await?;
        info!(group_id = %group_id, rule_id = %rule_id, "rule deleted");
        Ok(())
    }

    pub async fn rules(&self, group_id: &GroupId) -> DomainResult<Vec<(RuleId, Rule)>> {
        let Some(value) = self.deps.store.read(&paths::rules(group_id)).await? else {
            return Ok(Vec::new());
        };
        let rules: BTreeMap<String, Rule> = serde_json::from_value(value)?;
        Ok(rules
            .into_iter()
            .map(|(key, rule)| (RuleId::from_key(key), rule))
            .collect())
    }
}

/// 5-digit numeric invite code.
fn generate_invite_code() -> String {
    fastrand::u32(10_000..100_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn deps_with_user(uid: &str, username: &str) -> CoreDeps {
        let deps = CoreDeps::in_memory();
        deps.store
            .write(&format!("users/{uid}"), json!({"username": username}))
            .await
            .unwrap();
        deps
    }

    #[tokio::test]
    async fn create_group_seeds_creator_membership_and_points() {
        let deps = deps_with_user("creator", "cora").await;
        let store = GroupStore::new(deps.clone());
        let creator = Actor::new(UserId::from_key("creator"));

        let group_id = store
            .create_group(&creator, "The Flat", "icon.png", 1000)
            .await
            .unwrap();

        let group = store.group(&group_id).await.unwrap();
        assert_eq!(group.group_name, "The Flat");
        assert_eq!(group.creator_id, UserId::from_key("creator"));
        assert_eq!(group.initial_points, 1000);
        assert_eq!(group.invite_code.len(), 5);
        assert!(group.invite_code.chars().all(|c| c.is_ascii_digit()));

        let members = store.members(&group_id).await.unwrap();
        let membership = members.get("creator").unwrap();
        assert_eq!(membership.role, Role::Creator);
        assert_eq!(membership.name, "cora");

        let points = deps
            .store
            .read(&paths::member_points(&group_id, creator.user_id()))
            .await
            .unwrap();
        assert_eq!(points, Some(json!(1000)));
    }

    #[tokio::test]
    async fn create_group_rejects_bad_names() {
        let deps = deps_with_user("creator", "cora").await;
        let store = GroupStore::new(deps);
        let creator = Actor::new(UserId::from_key("creator"));

        let empty = store.create_group(&creator, "   ", "icon.png", 0).await;
        assert!(matches!(empty, Err(DomainError::InvalidArgument(_))));

        let long_name = "x".repeat(31);
        let too_long = store.create_group(&creator, &long_name, "icon.png", 0).await;
        assert!(matches!(too_long, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn groups_for_user_filters_by_membership() {
        let deps = deps_with_user("creator", "cora").await;
        let store = GroupStore::new(deps.clone());
        let creator = Actor::new(UserId::from_key("creator"));

        let mine = store
            .create_group(&creator, "Mine", "icon.png", 100)
            .await
            .unwrap();
        // A group the user is not part of
        deps.store
            .write(
                "groups/other",
                json!({
                    "groupName": "Other",
                    "creatorId": "someone",
                    "inviteCode": "99999",
                    "initialPoints": 0,
                    "groupIcon": "",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "members": {"someone": {"name": "s", "joinedAt": "2024-01-01T00:00:00Z", "role": "creator"}}
                }),
            )
            .await
            .unwrap();

        let groups = store.groups_for_user(creator.user_id()).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, mine);
    }

    #[tokio::test]
    async fn rule_crud_is_creator_only() {
        let deps = deps_with_user("creator", "cora").await;
        let store = GroupStore::new(deps);
        let creator = Actor::new(UserId::from_key("creator"));
        let outsider = Actor::new(UserId::from_key("outsider"));

        let group_id = store
            .create_group(&creator, "Rules", "icon.png", 0)
            .await
            .unwrap();

        let rule_id = store
            .add_rule(&creator, &group_id, "Dishes left out", -50)
            .await
            .unwrap();
        assert!(matches!(
            store.add_rule(&outsider, &group_id, "Nope", 10).await,
            Err(DomainError::Forbidden(_))
        ));

        store
            .update_rule(&creator, &group_id, &rule_id, "Dishes left overnight", -75)
            .await
            .unwrap();
        let rules = store.rules(&group_id).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].1.rule_name, "Dishes left overnight");
        assert_eq!(rules[0].1.points, -75);

        store.delete_rule(&creator, &group_id, &rule_id).await.unwrap();
        assert!(store.rules(&group_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribe_group_returns_snapshot() {
        let deps = deps_with_user("creator", "cora").await;
        let store = GroupStore::new(deps);
        let creator = Actor::new(UserId::from_key("creator"));

        let group_id = store
            .create_group(&creator, "Live", "icon.png", 10)
            .await
            .unwrap();

        let (snapshot, _events) = store.subscribe_group(&group_id).await.unwrap();
        assert_eq!(snapshot.unwrap().group_name, "Live");
    }
}
