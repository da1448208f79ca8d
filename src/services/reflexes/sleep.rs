//! Sleep reflex: fires at most once per night cycle, re-armed only
//! after a daytime tick has been observed since the last fire.

use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::models::{args, ReflexLifecycleEvent, ReflexResult, Step, StepMeta, TaskData, WorldSample};
use crate::services::config::SleepConfig;
use crate::services::lifecycle_emitter::LifecycleEmitter;

pub const GOAL_KEY: &str = "survival:sleep";
pub const BUILDER_NAME: &str = "sleep";
pub const CAN_PREEMPT: bool = false;

struct State {
    armed: bool,
    fired_this_night: bool,
    last_dawn_seen: bool,
}

pub struct SleepController {
    config: SleepConfig,
    state: RwLock<State>,
}

impl SleepController {
    pub fn new(config: SleepConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State { armed: true, fired_this_night: false, last_dawn_seen: false }),
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
        let is_night = sample.is_night()?;

        if !is_night {
            let mut state = self.state.write().await;
            if state.fired_this_night {
                state.fired_this_night = false;
                state.armed = true;
            }
            state.last_dawn_seen = true;
            return None;
        }

        {
            let mut state = self.state.write().await;
            if state.last_dawn_seen {
                state.armed = true;
                state.last_dawn_seen = false;
            }
        }

        if idle_reason != Some("no_tasks") {
            return None;
        }
        if sample.nearby_hostiles.unwrap_or(0) > self.config.max_hostiles {
            return None;
        }

        {
            let state = self.state.read().await;
            if !state.armed || state.fired_this_night {
                return None;
            }
        }

        let reflex_instance_id = Uuid::new_v4();
        let now = Utc::now();

        let step = Step {
            id: Uuid::new_v4(),
            label: "sleep".to_string(),
            order: 0,
            done: false,
            meta: StepMeta {
                leaf: "sleep".to_string(),
                args: args([
                    ("place_bed", json!(false)),
                    ("search_radius", json!(self.config.search_radius)),
                ]),
                executable: true,
            },
        };
        let task_data = TaskData { task_type: "survival".to_string(), steps: vec![step] };

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

        {
            let mut state = self.state.write().await;
            state.fired_this_night = true;
            state.armed = false;
        }

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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn night_sample() -> WorldSample {
        WorldSample { time_of_day: Some(18_000), nearby_hostiles: Some(0), ..Default::default() }
    }

    fn day_sample() -> WorldSample {
        WorldSample { time_of_day: Some(1_000), nearby_hostiles: Some(0), ..Default::default() }
    }

    #[tokio::test]
    async fn fires_once_at_night_then_not_again_same_night() {
        let ctl = SleepController::new(SleepConfig::default());
        let emitter = LifecycleEmitter::new(100);
        assert!(ctl.evaluate(&night_sample(), Some("no_tasks"), false, &emitter).await.is_some());
        assert!(ctl.evaluate(&night_sample(), Some("no_tasks"), false, &emitter).await.is_none());
    }

    #[tokio::test]
    async fn rearms_only_after_a_daytime_tick() {
        let ctl = SleepController::new(SleepConfig::default());
        let emitter = LifecycleEmitter::new(100);
        assert!(ctl.evaluate(&night_sample(), Some("no_tasks"), false, &emitter).await.is_some());

        // Still night, no dawn observed yet: stays disarmed.
        assert!(ctl.evaluate(&night_sample(), Some("no_tasks"), false, &emitter).await.is_none());

        assert!(ctl.evaluate(&day_sample(), Some("no_tasks"), false, &emitter).await.is_none());
        assert!(ctl.evaluate(&night_sample(), Some("no_tasks"), false, &emitter).await.is_some());
    }

    #[tokio::test]
    async fn unknown_time_of_day_is_fail_closed() {
        let ctl = SleepController::new(SleepConfig::default());
        let emitter = LifecycleEmitter::new(100);
        assert!(ctl.evaluate(&WorldSample::default(), Some("no_tasks"), false, &emitter).await.is_none());
    }

    #[tokio::test]
    async fn does_not_fire_with_hostiles_present() {
        let ctl = SleepController::new(SleepConfig::default());
        let emitter = LifecycleEmitter::new(100);
        let mut hostile_night = night_sample();
        hostile_night.nearby_hostiles = Some(1);
        assert!(ctl.evaluate(&hostile_night, Some("no_tasks"), false, &emitter).await.is_none());
    }
}
