use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rule record stored at `groups/{groupId}/rules/{ruleId}`.
///
/// Mutable by the creator only. Deletion is a hard delete; rule changes are
/// not historized (only point adjustments are).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub rule_name: String,
    /// Signed: positive rules award points, negative ones deduct.
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
