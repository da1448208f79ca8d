//! Structural mutual exclusion of terminal enqueue outcomes.
//!
//! `try_enqueue_reflex_task` folds the goal-key guard and the external
//! `addTask` call into a single tagged `EnqueueOutcome`, so the caller
//! can never accidentally emit more than one terminal lifecycle event
//! per `task_planned`.

use uuid::Uuid;

use crate::domain::models::{EnqueueOutcome, EnqueueSkipReason, TaskData, TaskMetadata, TaskProvenance};
use crate::domain::ports::TaskStore;
use crate::services::goal_key_guard::scan_for_outstanding_goal_key;
use crate::domain::models::GuardOutcome;

/// Attempt to enqueue a reflex-originated task, deduplicating against
/// outstanding tasks sharing `goal_key` first.
pub async fn try_enqueue_reflex_task(
    store: &dyn TaskStore,
    task_data: TaskData,
    goal_key: &str,
    reflex_instance_id: Uuid,
    builder_name: &str,
    stale_ms: i64,
) -> EnqueueOutcome {
    match scan_for_outstanding_goal_key(store, goal_key, stale_ms).await {
        Ok(GuardOutcome::Blocked { existing_task_id, .. }) => {
            return EnqueueOutcome::Skipped {
                reason: EnqueueSkipReason::DedupedExistingTask,
                error: None,
                existing_task_id: Some(existing_task_id),
            };
        }
        Ok(GuardOutcome::Clear) => {}
        Err(err) => {
            return EnqueueOutcome::Skipped {
                reason: EnqueueSkipReason::EnqueueFailed,
                error: Some(err.to_string()),
                existing_task_id: None,
            };
        }
    }

    // Only `{builder, source, goal_key, reflex_instance_id}` ever go on
    // the wire here, per spec.md §9's resolved open question — nothing
    // else may leak toward the hunger reflex's identity hash.
    let metadata = TaskMetadata {
        goal_key: goal_key.to_string(),
        reflex_instance_id,
        task_provenance: TaskProvenance {
            builder: builder_name.to_string(),
            source: "autonomous".to_string(),
        },
    };

    match store.add_task(task_data, metadata).await {
        Ok(task) if !task.id.is_empty() => EnqueueOutcome::Enqueued { task_id: task.id },
        Ok(_) => EnqueueOutcome::Skipped {
            reason: EnqueueSkipReason::EnqueueReturnedNull,
            error: None,
            existing_task_id: None,
        },
        Err(err) => EnqueueOutcome::Skipped {
            reason: EnqueueSkipReason::EnqueueFailed,
            error: Some(err.to_string()),
            existing_task_id: None,
        },
    }
}
