//! Scheduled poll expiry sweeps using tokio-cron-scheduler.
//!
//! Poll and election expiry must not depend on any particular client having
//! the chat open. Whichever process owns persistence runs this checker on a
//! schedule; each tick sweeps every group and resolves whatever is due.
//! Resolution itself is idempotent, so overlapping sweeps are harmless.

use anyhow::Result;
use serde_json::Value;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use super::deps::CoreDeps;
use super::store::paths;
use crate::common::GroupId;
use crate::domains::polls::PollEngine;

/// Sweeps all groups for expired, unresolved polls and elections.
pub struct PollExpiryChecker {
    deps: CoreDeps,
}

impl PollExpiryChecker {
    pub fn new(deps: CoreDeps) -> Self {
        Self { deps }
    }

    /// Resolve every due poll across all groups. Returns the number of
    /// polls resolved by this sweep.
    pub async fn sweep_all(&self) -> Result<u32> {
        let Some(groups) = self.deps.store.read(paths::GROUPS).await? else {
            return Ok(0);
        };
        let Value::Object(groups) = groups else {
            return Ok(0);
        };

        let engine = PollEngine::new(self.deps.clone());
        let now = self.deps.store.now();
        let mut resolved = 0;
        for group_key in groups.keys() {
            let group_id = GroupId::from_key(group_key.clone());
            // One broken group must not stall the rest of the sweep
            match engine.sweep_group(&group_id, now).await {
                Ok(count) => resolved += count,
                Err(e) => error!(group_id = %group_id, "expiry sweep failed: {}", e),
            }
        }
        Ok(resolved)
    }
}

/// Start the recurring expiry sweep on the schedule from config.
pub async fn start_expiry_scheduler(deps: CoreDeps) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let schedule = deps.config.expiry_sweep_schedule.clone();
    let sweep_deps = deps.clone();
    let sweep_job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let deps = sweep_deps.clone();
        Box::pin(async move {
            if let Err(e) = PollExpiryChecker::new(deps).sweep_all().await {
                error!("poll expiry sweep failed: {}", e);
            }
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    info!(schedule = %deps.config.expiry_sweep_schedule, "poll expiry scheduler started");
    Ok(scheduler)
}
