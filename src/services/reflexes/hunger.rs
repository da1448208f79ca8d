//! Hunger reflex: the one content-addressed controller in the set.
//!
//! Hysteresis (armed/disarmed) gates firing; a bounded, TTL-evicted map
//! of `ProofAccumulator` keyed by `reflexInstanceId` bridges the gap
//! between `evaluate` firing and the task's eventual terminal state,
//! at which point `build_proof_bundle` settles what actually happened.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use sha2::Digest;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::models::{
    args, EnqueueSkipReason, ExecutionReceipt, ExecutionReport, ExecutionResult, ProofAccumulator,
    ReflexLifecycleEvent, ReflexResult, Step, StepMeta, Task, TaskData, TaskStatus, WorldSample,
};
use crate::domain::ports::ProofRecorder;
use crate::services::config::HungerConfig;
use crate::services::lifecycle_emitter::LifecycleEmitter;
use crate::services::proof_bundle::{build_proof_bundle, derive_goal_id, steps_from_task, TriggerContext};
use crate::services::reflexes::food::is_food;
use crate::services::state_translator::translate;

pub const GOAL_KEY: &str = "survival:eat";
pub const BUILDER_NAME: &str = "hunger";
pub const CAN_PREEMPT: bool = true;

const TEMPLATE_NAME: &str = "eat_immediate";
const NEED_TYPE: &str = "survival";
const GOAL_DESCRIPTION: &str =
    "Consume available food to address hunger before it becomes critical.";
const URGENCY_SELECT_THRESHOLD: f64 = 0.7;

struct StoredAccumulator {
    accumulator: ProofAccumulator,
    threshold: f64,
}

/// Hunger's armed/disarmed hysteresis plus its in-flight proof
/// accumulators.
pub struct HungerController {
    config: HungerConfig,
    armed: RwLock<bool>,
    accumulators: RwLock<HashMap<Uuid, StoredAccumulator>>,
    accumulator_ttl: chrono::Duration,
    accumulator_capacity: usize,
}

impl HungerController {
    pub fn new(config: HungerConfig, accumulator_ttl_minutes: i64, accumulator_capacity: usize) -> Self {
        Self {
            config,
            armed: RwLock::new(true),
            accumulators: RwLock::new(HashMap::new()),
            accumulator_ttl: chrono::Duration::minutes(accumulator_ttl_minutes),
            accumulator_capacity,
        }
    }

    #[instrument(skip(self, sample, emitter))]
    pub async fn evaluate(
        &self,
        sample: &WorldSample,
        idle_reason: Option<&str>,
        dry_run: bool,
        emitter: &LifecycleEmitter,
    ) -> Option<ReflexResult> {
        let food = sample.food?;
        let inventory = sample.inventory.as_ref()?;

        self.evict_stale_accumulators().await;

        if !*self.armed.read().await {
            if food >= self.config.reset_threshold {
                debug!(food, "hunger reflex re-armed");
                *self.armed.write().await = true;
            }
            return None;
        }

        let critical = food <= self.config.critical_threshold;
        let urgent_and_idle =
            food <= self.config.trigger_threshold && idle_reason == Some("no_tasks");
        if !critical && !urgent_and_idle {
            return None;
        }

        let food_item = inventory.iter().find(|item| is_food(&item.name))?.name.clone();

        let hunger_urgency = (1.0 - food / 20.0).clamp(0.0, 1.0);
        if hunger_urgency <= URGENCY_SELECT_THRESHOLD {
            return None;
        }

        let threshold = if critical { self.config.critical_threshold } else { self.config.trigger_threshold };
        let reflex_instance_id = Uuid::new_v4();
        let now = Utc::now();

        let step = Step {
            id: Uuid::new_v4(),
            label: "consume food".to_string(),
            order: 0,
            done: false,
            meta: StepMeta {
                leaf: "consume_food".to_string(),
                args: args([("food_type", json!("any")), ("amount", json!(1))]),
                executable: true,
            },
        };
        let task_data = TaskData { task_type: NEED_TYPE.to_string(), steps: vec![step] };

        let inventory_before: Vec<(String, u32)> = inventory
            .iter()
            .filter(|item| is_food(&item.name))
            .map(|item| (item.name.clone(), item.count))
            .collect();

        let accumulator = ProofAccumulator {
            goal_id: derive_goal_id(NEED_TYPE, TEMPLATE_NAME),
            food_item,
            template_name: TEMPLATE_NAME.to_string(),
            homeostasis_digest: homeostasis_digest(sample),
            candidates_digest: candidates_digest(&inventory_before),
            triggered_at: now,
            food_before: food,
            inventory_before,
        };

        emitter
            .emit(ReflexLifecycleEvent::GoalFormulated {
                reflex_instance_id,
                timestamp: now,
                goal_key: GOAL_KEY.to_string(),
                builder_name: BUILDER_NAME.to_string(),
            })
            .await;

        let result = ReflexResult {
            goal_key: GOAL_KEY.to_string(),
            reflex_instance_id,
            builder_name: BUILDER_NAME.to_string(),
            task_data,
        };

        if dry_run {
            return Some(result);
        }

        *self.armed.write().await = false;
        self.store_accumulator(reflex_instance_id, accumulator, threshold).await;

        let pending_task_id = format!("pending-{}", &reflex_instance_id.simple().to_string()[..8]);
        emitter
            .emit(ReflexLifecycleEvent::TaskPlanned {
                reflex_instance_id,
                timestamp: Utc::now(),
                pending_task_id,
            })
            .await;

        Some(result)
    }

    pub async fn emit_task_enqueued(&self, reflex_instance_id: Uuid, task_id: &str, emitter: &LifecycleEmitter) {
        let goal_id = self
            .accumulators
            .read()
            .await
            .get(&reflex_instance_id)
            .map(|stored| stored.accumulator.goal_id.clone())
            .unwrap_or_default();
        emitter
            .emit(ReflexLifecycleEvent::TaskEnqueued {
                reflex_instance_id,
                timestamp: Utc::now(),
                task_id: task_id.to_string(),
                goal_id,
            })
            .await;
    }

    pub async fn emit_task_enqueue_skipped(
        &self,
        reflex_instance_id: Uuid,
        reason: EnqueueSkipReason,
        existing_task_id: Option<String>,
        emitter: &LifecycleEmitter,
    ) {
        let goal_id = self
            .accumulators
            .write()
            .await
            .remove(&reflex_instance_id)
            .map(|stored| stored.accumulator.goal_id)
            .unwrap_or_default();
        emitter
            .emit(ReflexLifecycleEvent::TaskEnqueueSkipped {
                reflex_instance_id,
                timestamp: Utc::now(),
                goal_id,
                reason,
                existing_task_id,
            })
            .await;
    }

    pub async fn on_task_terminal(
        &self,
        task: &Task,
        after_sample: Option<&WorldSample>,
        emitter: &LifecycleEmitter,
        recorder: &dyn ProofRecorder,
        run_id: &str,
    ) {
        let Some(metadata) = &task.metadata else { return };
        let reflex_instance_id = metadata.reflex_instance_id;
        let Some(stored) = self.accumulators.write().await.remove(&reflex_instance_id) else {
            warn!(%reflex_instance_id, "terminal task had no matching accumulator");
            return;
        };

        let execution_result = match task.status {
            TaskStatus::Completed => ExecutionResult::Ok,
            TaskStatus::Failed => ExecutionResult::Error,
            TaskStatus::Cancelled => ExecutionResult::Skipped,
            TaskStatus::Pending | TaskStatus::Active => return,
        };
        let execution = ExecutionReport {
            result: execution_result,
            receipt: receipt_from_task(task),
            task_id: task.id.clone(),
        };
        let context = TriggerContext {
            threshold: stored.threshold,
            task_steps: steps_from_task(task),
            goal_description: GOAL_DESCRIPTION.to_string(),
        };

        let (bundle, reason) =
            build_proof_bundle(&stored.accumulator, &context, &execution, after_sample, Utc::now());

        emitter
            .emit(ReflexLifecycleEvent::GoalVerified { reflex_instance_id, timestamp: Utc::now(), reason })
            .await;
        emitter
            .emit(ReflexLifecycleEvent::GoalClosed {
                reflex_instance_id,
                timestamp: Utc::now(),
                success: reason.is_verified(),
                reason,
            })
            .await;

        recorder.record_reflex_proof(run_id, bundle).await;
    }

    async fn store_accumulator(&self, reflex_instance_id: Uuid, accumulator: ProofAccumulator, threshold: f64) {
        let mut accumulators = self.accumulators.write().await;
        accumulators.insert(reflex_instance_id, StoredAccumulator { accumulator, threshold });

        while accumulators.len() > self.accumulator_capacity {
            if let Some(oldest_id) = accumulators
                .iter()
                .min_by_key(|(_, stored)| stored.accumulator.triggered_at)
                .map(|(id, _)| *id)
            {
                accumulators.remove(&oldest_id);
            } else {
                break;
            }
        }
    }

    async fn evict_stale_accumulators(&self) {
        let now = Utc::now();
        let ttl = self.accumulator_ttl;
        self.accumulators
            .write()
            .await
            .retain(|_, stored| now - stored.accumulator.triggered_at < ttl);
    }
}

fn receipt_from_task(task: &Task) -> ExecutionReceipt {
    let Some(step) = task.steps.first() else {
        return ExecutionReceipt::default();
    };
    let items_consumed = step
        .meta
        .args
        .get("items_consumed")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let food_consumed = step.meta.args.get("food_consumed").and_then(|v| v.as_bool());
    ExecutionReceipt { items_consumed, food_consumed }
}

fn homeostasis_digest(sample: &WorldSample) -> String {
    let signals = translate(sample);
    let bytes = serde_json::to_vec(&signals).expect("SignalVector always serialises");
    let digest = sha2::Sha256::digest(&bytes);
    hex::encode(digest)[..16].to_string()
}

fn candidates_digest(food_items: &[(String, u32)]) -> String {
    let mut sorted = food_items.to_vec();
    sorted.sort();
    let bytes = serde_json::to_vec(&sorted).expect("candidate list always serialises");
    let digest = sha2::Sha256::digest(&bytes);
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{InventoryItem, TaskMetadata, TaskProvenance};

    fn sample(food: f64, inventory: Vec<(&str, u32)>) -> WorldSample {
        WorldSample {
            food: Some(food),
            inventory: Some(
                inventory
                    .into_iter()
                    .map(|(name, count)| InventoryItem { name: name.to_string(), count })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn controller() -> HungerController {
        HungerController::new(HungerConfig::default(), 30, 50)
    }

    #[tokio::test]
    async fn fires_when_critical_food_with_recognised_item() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let result = ctl
            .evaluate(&sample(5.0, vec![("bread", 5)]), Some("no_tasks"), false, &emitter)
            .await;
        assert!(result.is_some());
        let result = result.unwrap();
        assert_eq!(result.goal_key, GOAL_KEY);
        assert_eq!(result.task_data.steps.len(), 1);
        assert_eq!(result.task_data.steps[0].meta.leaf, "consume_food");
    }

    #[tokio::test]
    async fn disarms_after_firing_then_returns_null() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let sample = sample(5.0, vec![("bread", 5)]);
        assert!(ctl.evaluate(&sample, Some("no_tasks"), false, &emitter).await.is_some());
        assert!(ctl.evaluate(&sample, Some("no_tasks"), false, &emitter).await.is_none());
    }

    #[tokio::test]
    async fn critical_override_bypasses_idle_gate() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let fired = ctl
            .evaluate(&sample(5.0, vec![("bread", 5)]), Some("all_in_backoff"), false, &emitter)
            .await;
        assert!(fired.is_some());

        let ctl = controller();
        let not_fired = ctl
            .evaluate(&sample(6.0, vec![("bread", 5)]), Some("all_in_backoff"), false, &emitter)
            .await;
        assert!(not_fired.is_none());
    }

    #[tokio::test]
    async fn requires_recognised_food_item() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let fired = ctl
            .evaluate(&sample(5.0, vec![("cobblestone", 10)]), Some("no_tasks"), false, &emitter)
            .await;
        assert!(fired.is_none());
    }

    #[tokio::test]
    async fn missing_food_or_inventory_is_fail_closed() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let no_food = WorldSample { inventory: Some(vec![]), ..Default::default() };
        assert!(ctl.evaluate(&no_food, Some("no_tasks"), false, &emitter).await.is_none());

        let no_inventory = WorldSample { food: Some(2.0), ..Default::default() };
        assert!(ctl.evaluate(&no_inventory, Some("no_tasks"), false, &emitter).await.is_none());
    }

    #[tokio::test]
    async fn dry_run_does_not_disarm_or_store_accumulator() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let sample = sample(5.0, vec![("bread", 5)]);
        let dry = ctl.evaluate(&sample, Some("no_tasks"), true, &emitter).await;
        assert!(dry.is_some());
        assert!(*ctl.armed.read().await);
        assert!(ctl.accumulators.read().await.is_empty());

        let live = ctl.evaluate(&sample, Some("no_tasks"), false, &emitter).await;
        assert!(live.is_some());
    }

    #[tokio::test]
    async fn rearms_once_food_reaches_reset_threshold() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let low = sample(5.0, vec![("bread", 5)]);
        assert!(ctl.evaluate(&low, Some("no_tasks"), false, &emitter).await.is_some());

        let mid = sample(10.0, vec![("bread", 5)]);
        assert!(ctl.evaluate(&mid, Some("no_tasks"), false, &emitter).await.is_none());
        assert!(!*ctl.armed.read().await);

        let full = sample(16.0, vec![("bread", 5)]);
        assert!(ctl.evaluate(&full, Some("no_tasks"), false, &emitter).await.is_none());
        assert!(*ctl.armed.read().await);
    }

    #[tokio::test]
    async fn on_task_terminal_emits_verified_and_closed_then_records() {
        let ctl = controller();
        let emitter = LifecycleEmitter::new(100);
        let sample = sample(5.0, vec![("bread", 5)]);
        let result = ctl.evaluate(&sample, Some("no_tasks"), false, &emitter).await.unwrap();

        let task = Task {
            id: "task-1".to_string(),
            status: TaskStatus::Completed,
            metadata: Some(TaskMetadata {
                goal_key: GOAL_KEY.to_string(),
                reflex_instance_id: result.reflex_instance_id,
                task_provenance: TaskProvenance { builder: BUILDER_NAME.to_string(), source: "autonomous".to_string() },
            }),
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
            steps: result.task_data.steps.clone(),
        };
        let after = sample.clone();
        let mut after = after;
        after.food = Some(11.0);
        after.inventory = Some(vec![InventoryItem { name: "bread".to_string(), count: 4 }]);

        struct RecordingRecorder(tokio::sync::Mutex<Vec<String>>);
        #[async_trait::async_trait]
        impl crate::domain::ports::ProofRecorder for RecordingRecorder {
            async fn record_reflex_proof(&self, run_id: &str, bundle: crate::domain::models::ProofBundle) {
                self.0.lock().await.push(format!("{run_id}:{}", bundle.bundle_hash));
            }
        }
        let recorder = RecordingRecorder(tokio::sync::Mutex::new(Vec::new()));

        ctl.on_task_terminal(&task, Some(&after), &emitter, &recorder, "run-1").await;

        assert!(ctl.accumulators.read().await.is_empty());
        let verified = emitter.snapshot_of_type("goal_verified").await;
        assert_eq!(verified.len(), 1);
        let closed = emitter.snapshot_of_type("goal_closed").await;
        assert_eq!(closed.len(), 1);
        assert_eq!(recorder.0.lock().await.len(), 1);
    }
}
