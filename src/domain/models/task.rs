//! Task contract.
//!
//! The reflex core never creates `Task` rows directly — it builds a
//! `TaskData` template and hands it to the external `addTask`
//! collaborator, which returns (or is assumed to already produce) a
//! `Task` matching this contract. The core never constructs the full
//! `Task`; this module exists so the goal-key guard and registry can
//! read the pieces they need from whatever the collaborator hands
//! back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Status of a task as tracked by the external task store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this status represents an outstanding task for the
    /// purposes of goal-key deduplication (spec §4.4: pending/active).
    pub fn is_outstanding(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Whether this status is a terminal state that the registry
    /// should dispatch to `onTaskTerminal`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Who produced a task and through what path — attached to task
/// metadata as `taskProvenance`. Deliberately just these two fields
/// per spec.md §9's open question: nothing else may leak into the
/// hunger proof bundle's identity hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProvenance {
    /// Stable builder name of the originating reflex controller.
    pub builder: String,
    /// Always `"autonomous"` for reflex-originated tasks.
    pub source: String,
}

/// Metadata attached to a reflex-originated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub goal_key: String,
    pub reflex_instance_id: Uuid,
    pub task_provenance: TaskProvenance,
}

/// A single executable step within a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub label: String,
    pub order: u32,
    pub done: bool,
    pub meta: StepMeta,
}

/// Dispatch information for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMeta {
    /// Dispatch key naming the leaf executor for this step.
    pub leaf: String,
    /// Parameters constrained by the named leaf's contract.
    pub args: HashMap<String, Value>,
    #[serde(default = "default_true")]
    pub executable: bool,
}

fn default_true() -> bool {
    true
}

/// Template for creating a `Task` through `addTask`. Carries no `id`,
/// `status`, or timestamps — those are assigned by the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    #[serde(rename = "type")]
    pub task_type: String,
    pub steps: Vec<Step>,
}

/// A task as returned by the external task store. The core only ever
/// reads these fields back; it never constructs one itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub metadata: Option<TaskMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub steps: Vec<Step>,
}

impl Task {
    /// Age of the task since its last update (or creation, if never
    /// updated), per spec.md §4.4's staleness rule.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.updated_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_is_outstanding() {
        assert!(TaskStatus::Pending.is_outstanding());
        assert!(TaskStatus::Active.is_outstanding());
        assert!(!TaskStatus::Completed.is_outstanding());
        assert!(!TaskStatus::Failed.is_outstanding());
        assert!(!TaskStatus::Cancelled.is_outstanding());
    }

    #[test]
    fn task_status_is_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Active.is_terminal());
    }

    #[test]
    fn task_age_prefers_updated_at() {
        let now = Utc::now();
        let task = Task {
            id: "t-1".to_string(),
            status: TaskStatus::Active,
            metadata: None,
            created_at: now - chrono::Duration::minutes(20),
            updated_at: Some(now - chrono::Duration::minutes(5)),
            steps: vec![],
        };
        let age = task.age(now);
        assert!(age >= chrono::Duration::minutes(5) && age < chrono::Duration::minutes(6));
    }

    #[test]
    fn task_age_falls_back_to_created_at() {
        let now = Utc::now();
        let task = Task {
            id: "t-2".to_string(),
            status: TaskStatus::Pending,
            metadata: None,
            created_at: now - chrono::Duration::minutes(10),
            updated_at: None,
            steps: vec![],
        };
        let age = task.age(now);
        assert!(age >= chrono::Duration::minutes(10) && age < chrono::Duration::minutes(11));
    }
}
