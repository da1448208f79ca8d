//! Content-addressed proof bundle: the identity/evidence split.
//!
//! Only `Identity` participates in `bundle_hash`. `Evidence` carries
//! everything useful for correlation (UUIDs, timings, candidate
//! choice) that must never reach the hasher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reflex::ExecutionResult;

/// Schema version embedded as the leading field of `Identity` so the
/// hash function choice can be revised without silently colliding
/// with bundles hashed under a prior scheme.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityTrigger {
    pub hunger_value: f64,
    pub threshold: f64,
    pub food_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPreconditions {
    pub food_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityGoal {
    pub need_type: String,
    pub template_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityStep {
    pub leaf: String,
    /// Canonicalised as a sorted `(key, value)` list so key order never
    /// affects the hash.
    pub args: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityTask {
    pub steps: Vec<IdentityStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityExecution {
    pub result: ExecutionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityVerification {
    pub food_before: f64,
    pub food_after: Option<f64>,
    pub delta: Option<f64>,
    /// Lexicographically sorted before hashing (spec.md §3.2).
    pub items_consumed: Vec<String>,
}

/// The hashed half of a proof bundle. Field order here is the
/// canonical serialization order; `bundle_hash` is a digest of this
/// struct's canonical JSON encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub schema_version: u32,
    pub trigger: IdentityTrigger,
    pub preconditions: IdentityPreconditions,
    pub goal: IdentityGoal,
    pub task: IdentityTask,
    pub execution: IdentityExecution,
    pub verification: IdentityVerification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub trigger_to_goal_ms: i64,
    pub goal_to_task_ms: i64,
    pub task_to_execution_ms: i64,
    pub total_ms: i64,
}

/// The unhashed half: everything useful for correlating a bundle back
/// to the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub proof_id: Uuid,
    pub goal_id: String,
    pub task_id: String,
    pub homeostasis_sample_digest: String,
    pub candidates_digest: String,
    pub execution_receipt: super::reflex::ExecutionReceipt,
    pub candidate_food_item: String,
    pub candidate_food_count: u32,
    pub timing: Timing,
    pub triggered_at: DateTime<Utc>,
}

/// Immutable, content-addressed record of the full
/// trigger→goal→task→execution→verification chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofBundle {
    pub identity: Identity,
    pub evidence: Evidence,
    /// 16-hex-character digest of the canonicalised `identity`.
    pub bundle_hash: String,
}
