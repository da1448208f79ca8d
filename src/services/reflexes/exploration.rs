//! Exploration reflex: fires a random wander target after enough idle
//! ticks, then cools down. Not content-addressed — the target position
//! is random, so there is nothing meaningful to hash against.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::models::{args, ReflexLifecycleEvent, ReflexResult, Step, StepMeta, TaskData, WorldSample};
use crate::services::config::ExplorationConfig;
use crate::services::lifecycle_emitter::LifecycleEmitter;

pub const GOAL_KEY: &str = "explore:wander";
pub const BUILDER_NAME: &str = "exploration";
pub const CAN_PREEMPT: bool = false;

/// Retained per-instance for post-execution correlation only; never
/// fed into a hash.
struct WanderEvidence {
    target: (f64, f64, f64),
    triggered_at: DateTime<Utc>,
}

pub struct ExplorationController {
    config: ExplorationConfig,
    armed: RwLock<bool>,
    last_fired_at: RwLock<Option<DateTime<Utc>>>,
    consecutive_idle_ticks: RwLock<u32>,
    consecutive_non_idle_ticks: RwLock<u32>,
    evidence: RwLock<HashMap<Uuid, WanderEvidence>>,
    evidence_ttl: chrono::Duration,
    evidence_capacity: usize,
}

impl ExplorationController {
    pub fn new(config: ExplorationConfig, evidence_ttl_minutes: i64, evidence_capacity: usize) -> Self {
        Self {
            config,
            armed: RwLock::new(true),
            last_fired_at: RwLock::new(None),
            consecutive_idle_ticks: RwLock::new(0),
            consecutive_non_idle_ticks: RwLock::new(0),
            evidence: RwLock::new(HashMap::new()),
            evidence_ttl: chrono::Duration::minutes(evidence_ttl_minutes),
            evidence_capacity,
        }
    }

    /// Advance idle/non-idle counters and possibly re-arm. Called once
    /// per tick regardless of whether `evaluate` is invoked this tick.
    pub async fn tick(&self, is_idle: bool) {
        if is_idle {
            *self.consecutive_idle_ticks.write().await += 1;
            *self.consecutive_non_idle_ticks.write().await = 0;
        } else {
            let mut non_idle = self.consecutive_non_idle_ticks.write().await;
            *non_idle += 1;
            if *non_idle >= self.config.idle_reset_ticks {
                *self.consecutive_idle_ticks.write().await = 0;
            }
        }

        if !*self.armed.read().await {
            if let Some(fired_at) = *self.last_fired_at.read().await {
                if Utc::now() - fired_at >= chrono::Duration::milliseconds(self.config.cooldown_ms) {
                    *self.armed.write().await = true;
                }
            }
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
        if idle_reason != Some("no_tasks") {
            return None;
        }
        let position = sample.position?;
        let health = sample.health?;
        let food = sample.food?;

        if !*self.armed.read().await {
            return None;
        }
        if *self.consecutive_idle_ticks.read().await < self.config.idle_ticks_to_trigger {
            return None;
        }
        if health < self.config.min_health || food < self.config.min_food {
            return None;
        }
        if sample.nearby_hostiles.unwrap_or(0) > self.config.max_hostiles {
            return None;
        }

        let mut rng = rand::thread_rng();
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let distance = rng.gen_range(self.config.min_displacement..=self.config.max_displacement);
        let target = (
            position.x + distance * angle.cos(),
            position.y,
            position.z + distance * angle.sin(),
        );

        let reflex_instance_id = Uuid::new_v4();
        let now = Utc::now();

        let step = Step {
            id: Uuid::new_v4(),
            label: "move to wander target".to_string(),
            order: 0,
            done: false,
            meta: StepMeta {
                leaf: "move_to".to_string(),
                args: args([(
                    "pos",
                    json!({"x": target.0, "y": target.1, "z": target.2}),
                )]),
                executable: true,
            },
        };
        let task_data = TaskData { task_type: "explore".to_string(), steps: vec![step] };

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
        *self.last_fired_at.write().await = Some(now);
        self.store_evidence(reflex_instance_id, target, now).await;

        let pending_task_id = format!("pending-{}", &reflex_instance_id.simple().to_string()[..8]);
        emitter
            .emit(ReflexLifecycleEvent::TaskPlanned { reflex_instance_id, timestamp: now, pending_task_id })
            .await;

        Some(result)
    }

    pub async fn emit_task_enqueued(&self, reflex_instance_id: Uuid, task_id: &str, emitter: &LifecycleEmitter) {
        emitter
            .emit(ReflexLifecycleEvent::TaskEnqueued {
                reflex_instance_id,
                timestamp: Utc::now(),
                task_id: task_id.to_string(),
                goal_id: GOAL_KEY.to_string(),
            })
            .await;
    }

    pub async fn emit_task_enqueue_skipped(
        &self,
        reflex_instance_id: Uuid,
        reason: crate::domain::models::EnqueueSkipReason,
        existing_task_id: Option<String>,
        emitter: &LifecycleEmitter,
    ) {
        self.evidence.write().await.remove(&reflex_instance_id);
        emitter
            .emit(ReflexLifecycleEvent::TaskEnqueueSkipped {
                reflex_instance_id,
                timestamp: Utc::now(),
                goal_id: GOAL_KEY.to_string(),
                reason,
                existing_task_id,
            })
            .await;
    }

    async fn store_evidence(&self, reflex_instance_id: Uuid, target: (f64, f64, f64), triggered_at: DateTime<Utc>) {
        let mut evidence = self.evidence.write().await;
        let now = Utc::now();
        evidence.retain(|_, e| now - e.triggered_at < self.evidence_ttl);
        evidence.insert(reflex_instance_id, WanderEvidence { target, triggered_at });

        while evidence.len() > self.evidence_capacity {
            if let Some(oldest) = evidence.iter().min_by_key(|(_, e)| e.triggered_at).map(|(id, _)| *id) {
                evidence.remove(&oldest);
            } else {
                break;
            }
        }
    }
}
