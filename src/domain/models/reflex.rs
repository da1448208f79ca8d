//! Reflex result, proof accumulator, and lifecycle event types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::task::TaskData;

/// What a controller's `evaluate` returns when it decides to fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexResult {
    pub goal_key: String,
    pub reflex_instance_id: Uuid,
    pub builder_name: String,
    pub task_data: TaskData,
}

/// Per-instance mutable state the hunger controller retains between
/// `evaluate` firing and the task's terminal transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofAccumulator {
    pub goal_id: String,
    pub food_item: String,
    pub template_name: String,
    pub homeostasis_digest: String,
    pub candidates_digest: String,
    pub triggered_at: DateTime<Utc>,
    pub food_before: f64,
    pub inventory_before: Vec<(String, u32)>,
}

/// Outcome of a call to `tryEnqueueReflexTask`: a single tagged value
/// so the caller cannot emit more than one terminal event per
/// `task_planned`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    Enqueued { task_id: String },
    Skipped {
        reason: EnqueueSkipReason,
        error: Option<String>,
        existing_task_id: Option<String>,
    },
}

/// Closed vocabulary of reasons an enqueue attempt was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueSkipReason {
    DedupedExistingTask,
    EnqueueFailed,
    EnqueueReturnedNull,
}

impl EnqueueSkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DedupedExistingTask => "DEDUPED_EXISTING_TASK",
            Self::EnqueueFailed => "ENQUEUE_FAILED",
            Self::EnqueueReturnedNull => "ENQUEUE_RETURNED_NULL",
        }
    }
}

/// Outcome of the goal-key guard scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardOutcome {
    Clear,
    Blocked { existing_task_id: String, task_age_ms: i64 },
}

/// Closed vocabulary of proof verification outcomes (spec.md §4.3.1b).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    AfterStateUnavailable,
    ReceiptConfirmsConsumption,
    FoodIncreasedAndConsumed,
    FoodIncreasedButNoConsumptionEvidence,
    FoodIncreasedButInventoryUnavailable,
    NoFoodIncreaseOrConsumptionEvidence,
}

impl VerificationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AfterStateUnavailable => "AFTER_STATE_UNAVAILABLE",
            Self::ReceiptConfirmsConsumption => "RECEIPT_CONFIRMS_CONSUMPTION",
            Self::FoodIncreasedAndConsumed => "FOOD_INCREASED_AND_CONSUMED",
            Self::FoodIncreasedButNoConsumptionEvidence => {
                "FOOD_INCREASED_BUT_NO_CONSUMPTION_EVIDENCE"
            }
            Self::FoodIncreasedButInventoryUnavailable => {
                "FOOD_INCREASED_BUT_INVENTORY_UNAVAILABLE"
            }
            Self::NoFoodIncreaseOrConsumptionEvidence => {
                "NO_FOOD_INCREASE_OR_CONSUMPTION_EVIDENCE"
            }
        }
    }

    /// The first three reasons represent verified consumption; the
    /// rest are failures (spec.md §4.3.1b step 2).
    pub fn is_verified(self) -> bool {
        matches!(
            self,
            Self::AfterStateUnavailable
                | Self::ReceiptConfirmsConsumption
                | Self::FoodIncreasedAndConsumed
        )
    }
}

/// Report of how a task's execution concluded, as handed to
/// `buildProofBundle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub result: ExecutionResult,
    pub receipt: ExecutionReceipt,
    pub task_id: String,
}

/// The executor's self-reported outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionResult {
    Ok,
    Error,
    Skipped,
}

impl ExecutionResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

/// Executor-reported evidence of consumption, independent of the
/// before/after world-state diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub items_consumed: u32,
    pub food_consumed: Option<bool>,
}

/// Tagged union of reflex lifecycle events. Every variant carries
/// `reflex_instance_id` and a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReflexLifecycleEvent {
    GoalFormulated {
        reflex_instance_id: Uuid,
        timestamp: DateTime<Utc>,
        goal_key: String,
        builder_name: String,
    },
    TaskPlanned {
        reflex_instance_id: Uuid,
        timestamp: DateTime<Utc>,
        pending_task_id: String,
    },
    TaskEnqueued {
        reflex_instance_id: Uuid,
        timestamp: DateTime<Utc>,
        task_id: String,
        goal_id: String,
    },
    TaskEnqueueSkipped {
        reflex_instance_id: Uuid,
        timestamp: DateTime<Utc>,
        goal_id: String,
        reason: EnqueueSkipReason,
        existing_task_id: Option<String>,
    },
    StepCompleted {
        reflex_instance_id: Uuid,
        timestamp: DateTime<Utc>,
        step_id: Uuid,
    },
    GoalVerified {
        reflex_instance_id: Uuid,
        timestamp: DateTime<Utc>,
        reason: VerificationReason,
    },
    GoalClosed {
        reflex_instance_id: Uuid,
        timestamp: DateTime<Utc>,
        success: bool,
        reason: VerificationReason,
    },
}

impl ReflexLifecycleEvent {
    pub fn reflex_instance_id(&self) -> Uuid {
        match self {
            Self::GoalFormulated { reflex_instance_id, .. }
            | Self::TaskPlanned { reflex_instance_id, .. }
            | Self::TaskEnqueued { reflex_instance_id, .. }
            | Self::TaskEnqueueSkipped { reflex_instance_id, .. }
            | Self::StepCompleted { reflex_instance_id, .. }
            | Self::GoalVerified { reflex_instance_id, .. }
            | Self::GoalClosed { reflex_instance_id, .. } => *reflex_instance_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::GoalFormulated { timestamp, .. }
            | Self::TaskPlanned { timestamp, .. }
            | Self::TaskEnqueued { timestamp, .. }
            | Self::TaskEnqueueSkipped { timestamp, .. }
            | Self::StepCompleted { timestamp, .. }
            | Self::GoalVerified { timestamp, .. }
            | Self::GoalClosed { timestamp, .. } => *timestamp,
        }
    }

    /// Stable type tag, matching the `#[serde(tag = "type")]` rename.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GoalFormulated { .. } => "goal_formulated",
            Self::TaskPlanned { .. } => "task_planned",
            Self::TaskEnqueued { .. } => "task_enqueued",
            Self::TaskEnqueueSkipped { .. } => "task_enqueue_skipped",
            Self::StepCompleted { .. } => "step_completed",
            Self::GoalVerified { .. } => "goal_verified",
            Self::GoalClosed { .. } => "goal_closed",
        }
    }
}

/// Free-form argument bag helper for building step args without
/// repeating `serde_json::json!` boilerplate at call sites.
pub fn args(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> HashMap<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_reason_classifies_verified_vs_failure() {
        assert!(VerificationReason::AfterStateUnavailable.is_verified());
        assert!(VerificationReason::ReceiptConfirmsConsumption.is_verified());
        assert!(VerificationReason::FoodIncreasedAndConsumed.is_verified());
        assert!(!VerificationReason::FoodIncreasedButNoConsumptionEvidence.is_verified());
        assert!(!VerificationReason::FoodIncreasedButInventoryUnavailable.is_verified());
        assert!(!VerificationReason::NoFoodIncreaseOrConsumptionEvidence.is_verified());
    }

    #[test]
    fn lifecycle_event_exposes_common_fields() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let event = ReflexLifecycleEvent::GoalFormulated {
            reflex_instance_id: id,
            timestamp: now,
            goal_key: "survival:eat".to_string(),
            builder_name: "hunger".to_string(),
        };
        assert_eq!(event.reflex_instance_id(), id);
        assert_eq!(event.timestamp(), now);
        assert_eq!(event.type_name(), "goal_formulated");
    }

    #[test]
    fn enqueue_skip_reason_wire_strings() {
        assert_eq!(
            EnqueueSkipReason::DedupedExistingTask.as_str(),
            "DEDUPED_EXISTING_TASK"
        );
        assert_eq!(EnqueueSkipReason::EnqueueFailed.as_str(), "ENQUEUE_FAILED");
        assert_eq!(
            EnqueueSkipReason::EnqueueReturnedNull.as_str(),
            "ENQUEUE_RETURNED_NULL"
        );
    }
}
