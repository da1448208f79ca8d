//! Deduplicate reflex tasks against outstanding tasks sharing a goal
//! key, with a staleness bypass so a stuck task doesn't block new
//! reflexes forever.

use chrono::Utc;
use tracing::warn;

use crate::domain::error::TaskQueryError;
use crate::domain::models::{GuardOutcome, Task, TaskStatus};
use crate::domain::ports::TaskStore;

/// Scan outstanding tasks for one matching `goal_key` by exact string
/// equality on `metadata.goal_key`. A match blocks unless it has gone
/// stale (`now - updated_at >= stale_ms`), in which case the scan
/// reports `Clear` and logs a warning — the stale-escape signal named
/// in spec.md §4.4.
pub async fn scan_for_outstanding_goal_key(
    store: &dyn TaskStore,
    goal_key: &str,
    stale_ms: i64,
) -> Result<GuardOutcome, TaskQueryError> {
    let tasks = store
        .get_tasks(Some(&[TaskStatus::Pending, TaskStatus::Active]))
        .await?;

    let now = Utc::now();
    let stale_window = chrono::Duration::milliseconds(stale_ms);

    for task in &tasks {
        let Some(metadata) = &task.metadata else {
            continue;
        };
        if metadata.goal_key != goal_key {
            continue;
        }

        let age = task.age(now);
        if age < stale_window {
            return Ok(GuardOutcome::Blocked {
                existing_task_id: task.id.clone(),
                task_age_ms: age.num_milliseconds(),
            });
        }

        warn!(
            task_id = %task.id,
            goal_key,
            age_ms = age.num_milliseconds(),
            "outstanding task exceeded staleness window; treating goal key as clear"
        );
    }

    Ok(GuardOutcome::Clear)
}
