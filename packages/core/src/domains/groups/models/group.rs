use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::UserId;

/// Group record stored at `groups/{groupId}`.
///
/// Child collections (members, memberPoints, history, rules, messages) live
/// under the same path but are loaded separately; unknown fields on the
/// assembled record are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_name: String,
    /// Exactly one creator at any time, always present in members.
    pub creator_id: UserId,
    /// 5-digit numeric string used to locate the group for join requests.
    pub invite_code: String,
    /// Balance every new member starts with.
    pub initial_points: i64,
    pub group_icon: String,
    pub created_at: DateTime<Utc>,
}

/// Membership record stored at `groups/{groupId}/members/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub name: String,
    pub joined_at: DateTime<Utc>,
    pub role: Role,
}

/// Exactly one member per group holds `Creator`, matching `Group.creator_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Member,
}
