use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::UserId;

/// A time-bounded vote embedded in the message stream.
///
/// The same shape serves both message types: a poll carries a question and
/// option labels voted on by index, an election carries candidate user ids
/// voted on directly. A poll is open while `now < expires_at` and resolves
/// exactly once after that; `resolved` is the claim flag that makes
/// resolution idempotent across concurrent checkers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub candidates: Vec<UserId>,
    /// Ballot box: one entry per voter, last vote wins.
    #[serde(default)]
    pub votes: BTreeMap<String, Choice>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
}

impl Poll {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A single ballot entry: an option index for polls, a candidate key for
/// elections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choice {
    Option(u32),
    Candidate(UserId),
}
