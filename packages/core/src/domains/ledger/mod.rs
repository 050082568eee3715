//! Points ledger - the only sanctioned path to change a member's balance.
//!
//! Every balance mutation goes through `apply_delta`, which pairs the new
//! balance with an immutable history entry. Balances must reconcile with
//! history at all times: `balance == initial_points + sum(signed deltas)`.
//!
//! Concurrent adjustments to the same balance are resolved optimistically:
//! the balance write is a compare-and-swap retried a bounded number of
//! times, and callers see `Conflict` when the race is lost for good.

pub mod models;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::common::{Actor, DomainError, DomainResult, EntryId, GroupCapability, GroupId, UserId};
use crate::kernel::store::paths;
use crate::kernel::CoreDeps;
use models::{ChangeType, HistoryEntry};

pub struct PointsLedger {
    deps: CoreDeps,
}

impl PointsLedger {
    pub fn new(deps: CoreDeps) -> Self {
        Self { deps }
    }

    /// Adjust a member's balance by a signed delta.
    ///
    /// A zero delta is a no-op, not an error: no entry is written and
    /// `None` is returned. Otherwise returns the id of the history entry
    /// recording the change.
    pub async fn apply_delta(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        user_id: &UserId,
        delta: i64,
    ) -> DomainResult<Option<EntryId>> {
        if delta == 0 {
            debug!(group_id = %group_id, user_id = %user_id, "zero delta ignored");
            return Ok(None);
        }

        let group_value = self
            .deps
            .store
            .read(&paths::group(group_id))
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        let group = serde_json::from_value(group_value)?;
        actor.can(GroupCapability::AdjustPoints).check(&group)?;

        let points_path = paths::member_points(group_id, user_id);
        let mut attempts = 0;
        loop {
            let current = self
                .deps
                .store
                .read(&points_path)
                .await?
                .ok_or(DomainError::NotFound("member"))?;
            let balance: i64 = serde_json::from_value(current.clone())?;
            let new_balance = balance + delta;

            let applied = self
                .deps
                .store
                .compare_and_swap(&points_path, Some(current), Value::from(new_balance))
                .await?;
            if applied {
                return self
                    .record_entry(actor, group_id, user_id, delta, balance, new_balance)
                    .await;
            }

            attempts += 1;
            if attempts >= self.deps.config.ledger_cas_retries {
                return Err(DomainError::Conflict("balance changed concurrently"));
            }
        }
    }

    async fn record_entry(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        user_id: &UserId,
        delta: i64,
        old_balance: i64,
        new_balance: i64,
    ) -> DomainResult<Option<EntryId>> {
        let entry = HistoryEntry {
            user_id: user_id.clone(),
            points_updated: delta.abs(),
            change_type: if delta > 0 {
                ChangeType::Added
            } else {
                ChangeType::Deducted
            },
            updated_at: self.deps.store.now(),
            updated_by: actor.user_id().clone(),
        };

        let appended = self
            .deps
            .store
            .append(&paths::history(group_id), serde_json::to_value(&entry)?)
            .await;
        match appended {
            Ok(key) => {
                info!(
                    group_id = %group_id,
                    user_id = %user_id,
                    delta,
                    new_balance,
                    "points adjusted"
                );
                Ok(Some(EntryId::from_key(key)))
            }
            Err(err) => {
                // A balance must never change without a matching entry; put
                // the old balance back if nothing else has touched it since.
                let points_path = paths::member_points(group_id, user_id);
                let _ = self
                    .deps
                    .store
                    .compare_and_swap(
                        &points_path,
                        Some(Value::from(new_balance)),
                        Value::from(old_balance),
                    )
                    .await;
                Err(err.into())
            }
        }
    }

    /// Current balance for a member.
    pub async fn balance(&self, group_id: &GroupId, user_id: &UserId) -> DomainResult<i64> {
        let value = self
            .deps
            .store
            .read(&paths::member_points(group_id, user_id))
            .await?
            .ok_or(DomainError::NotFound("member"))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Every member's balance, highest first: the leaderboard projection.
    /// Equal balances keep member-key order.
    pub async fn balances(&self, group_id: &GroupId) -> DomainResult<Vec<(UserId, i64)>> {
        let value = self
            .deps
            .store
            .read(&paths::points(group_id))
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        let balances: BTreeMap<String, i64> = serde_json::from_value(value)?;
        let mut balances: Vec<(UserId, i64)> = balances
            .into_iter()
            .map(|(key, balance)| (UserId::from_key(key), balance))
            .collect();
        balances.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(balances)
    }

    /// Full adjustment history for a group, newest first.
    pub async fn history(&self, group_id: &GroupId) -> DomainResult<Vec<(EntryId, HistoryEntry)>> {
        let Some(value) = self.deps.store.read(&paths::history(group_id)).await? else {
            return Ok(Vec::new());
        };
        let entries: BTreeMap<String, HistoryEntry> = serde_json::from_value(value)?;
        let mut entries: Vec<(EntryId, HistoryEntry)> = entries
            .into_iter()
            .map(|(key, entry)| (EntryId::from_key(key), entry))
            .collect();
        entries.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at));
        Ok(entries)
    }
}
