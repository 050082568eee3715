use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::UserId;

/// Direction of a point adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Deducted,
}

impl ChangeType {
    pub fn sign(&self) -> i64 {
        match self {
            ChangeType::Added => 1,
            ChangeType::Deducted => -1,
        }
    }
}

/// Immutable ledger entry stored at `groups/{groupId}/history/{entryId}`.
///
/// The magnitude is stored unsigned with the direction in `change_type`;
/// the sum of signed deltas for a user equals their current balance minus
/// the group's initial points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The member whose balance changed.
    pub user_id: UserId,
    /// Non-negative magnitude of the change.
    pub points_updated: i64,
    pub change_type: ChangeType,
    /// Server-assigned timestamp, resolved at write time.
    pub updated_at: DateTime<Utc>,
    /// The creator who made the adjustment.
    pub updated_by: UserId,
}

impl HistoryEntry {
    /// The entry's contribution to the balance: `+points_updated` for
    /// additions, `-points_updated` for deductions.
    pub fn signed_delta(&self) -> i64 {
        self.points_updated * self.change_type.sign()
    }
}
