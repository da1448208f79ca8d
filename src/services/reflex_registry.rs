//! Priority-ordered tick evaluator.
//!
//! Holds the world-state cache and the three reflex controllers in
//! fixed priority order (hunger, sleep, exploration). Each tick fetches
//! at most one world-state snapshot, visits reflexes until the first
//! fire, and enqueues at most one task — mirroring the teacher's
//! `EventScheduler` tick-loop shape (`services/event_scheduler.rs`)
//! without its persistence layer, since accumulators here are purely
//! in-memory per spec.md §3.3.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, instrument, warn};

use crate::domain::models::{EnqueueOutcome, ReflexResult, Task, WorldSample};
use crate::domain::ports::{ProofRecorder, TaskStore, WorldStateFetcher};
use crate::services::enqueue::try_enqueue_reflex_task;
use crate::services::lifecycle_emitter::LifecycleEmitter;
use crate::services::reflexes::exploration::ExplorationController;
use crate::services::reflexes::hunger::HungerController;
use crate::services::reflexes::sleep::SleepController;
use crate::services::world_state_cache::WorldStateCache;

/// Outcome of a single `evaluate_tick` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub fired: bool,
    pub reflex_name: Option<String>,
}

/// The three reflex controllers in fixed priority order. An enum
/// rather than a boxed trait object: each controller's `evaluate` and
/// lifecycle-bridge signatures already agree, but `on_task_terminal`
/// does not (only hunger needs a recorder and a run id), so a uniform
/// `dyn` seam would need to paper over that anyway.
enum Reflex {
    Hunger(Arc<HungerController>),
    Sleep(Arc<SleepController>),
    Exploration(Arc<ExplorationController>),
}

impl Reflex {
    fn name(&self) -> &'static str {
        match self {
            Self::Hunger(_) => crate::services::reflexes::hunger::BUILDER_NAME,
            Self::Sleep(_) => crate::services::reflexes::sleep::BUILDER_NAME,
            Self::Exploration(_) => crate::services::reflexes::exploration::BUILDER_NAME,
        }
    }

    fn builder_name(&self) -> &'static str {
        self.name()
    }

    fn can_preempt(&self) -> bool {
        match self {
            Self::Hunger(_) => crate::services::reflexes::hunger::CAN_PREEMPT,
            Self::Sleep(_) => crate::services::reflexes::sleep::CAN_PREEMPT,
            Self::Exploration(_) => crate::services::reflexes::exploration::CAN_PREEMPT,
        }
    }

    async fn evaluate(
        &self,
        sample: &WorldSample,
        idle_reason: Option<&str>,
        dry_run: bool,
        emitter: &LifecycleEmitter,
    ) -> Option<ReflexResult> {
        match self {
            Self::Hunger(ctl) => ctl.evaluate(sample, idle_reason, dry_run, emitter).await,
            Self::Sleep(ctl) => ctl.evaluate(sample, idle_reason, dry_run, emitter).await,
            Self::Exploration(ctl) => ctl.evaluate(sample, idle_reason, dry_run, emitter).await,
        }
    }

    async fn on_enqueued(&self, reflex_instance_id: uuid::Uuid, task_id: &str, emitter: &LifecycleEmitter) {
        match self {
            Self::Hunger(ctl) => ctl.emit_task_enqueued(reflex_instance_id, task_id, emitter).await,
            Self::Sleep(ctl) => ctl.emit_task_enqueued(reflex_instance_id, task_id, emitter).await,
            Self::Exploration(ctl) => ctl.emit_task_enqueued(reflex_instance_id, task_id, emitter).await,
        }
    }

    async fn on_skipped(
        &self,
        reflex_instance_id: uuid::Uuid,
        reason: crate::domain::models::EnqueueSkipReason,
        existing_task_id: Option<String>,
        emitter: &LifecycleEmitter,
    ) {
        match self {
            Self::Hunger(ctl) => {
                ctl.emit_task_enqueue_skipped(reflex_instance_id, reason, existing_task_id, emitter).await
            }
            Self::Sleep(ctl) => {
                ctl.emit_task_enqueue_skipped(reflex_instance_id, reason, existing_task_id, emitter).await
            }
            Self::Exploration(ctl) => {
                ctl.emit_task_enqueue_skipped(reflex_instance_id, reason, existing_task_id, emitter).await
            }
        }
    }

    async fn on_task_terminal(
        &self,
        task: &Task,
        after_sample: Option<&WorldSample>,
        emitter: &LifecycleEmitter,
        recorder: &dyn ProofRecorder,
        run_id: &str,
    ) {
        // Only hunger builds and records a proof bundle on terminal;
        // exploration and sleep have nothing left to reconcile once
        // their task resolves (spec.md §4.3.2, §4.3.3 name no such
        // bridge — only hunger's §4.3.1b does).
        if let Self::Hunger(ctl) = self {
            ctl.on_task_terminal(task, after_sample, emitter, recorder, run_id).await;
        }
    }
}

/// Tick scheduler: holds the cache and every registered reflex in
/// priority order (ascending — index 0 is highest priority).
pub struct ReflexRegistry<F: WorldStateFetcher> {
    cache: WorldStateCache<F>,
    reflexes: Vec<Reflex>,
    emitter: LifecycleEmitter,
}

impl<F: WorldStateFetcher> ReflexRegistry<F> {
    pub fn new(
        cache: WorldStateCache<F>,
        hunger: Arc<HungerController>,
        sleep: Arc<SleepController>,
        exploration: Arc<ExplorationController>,
        emitter: LifecycleEmitter,
    ) -> Self {
        Self {
            cache,
            reflexes: vec![Reflex::Hunger(hunger), Reflex::Sleep(sleep), Reflex::Exploration(exploration)],
            emitter,
        }
    }

    pub fn emitter(&self) -> &LifecycleEmitter {
        &self.emitter
    }

    /// Evaluate one tick: fetch state, visit reflexes in priority
    /// order, short-circuit on the first fire.
    #[instrument(skip(self, store), fields(idle_reason))]
    pub async fn evaluate_tick(
        &self,
        idle_reason: Option<&str>,
        store: &dyn TaskStore,
        stale_ms: i64,
        dry_run: bool,
    ) -> TickOutcome {
        let Some(sample) = self.cache.get().await else {
            return TickOutcome { fired: false, reflex_name: None };
        };

        for reflex in &self.reflexes {
            if idle_reason.is_none() && !reflex.can_preempt() {
                continue;
            }

            let outcome = AssertUnwindSafe(reflex.evaluate(&sample, idle_reason, dry_run, &self.emitter))
                .catch_unwind()
                .await;

            let result = match outcome {
                Ok(result) => result,
                Err(_) => {
                    error!(reflex = reflex.name(), "reflex evaluate panicked, skipping");
                    continue;
                }
            };

            let Some(result) = result else { continue };

            if dry_run {
                return TickOutcome { fired: true, reflex_name: Some(reflex.name().to_string()) };
            }

            match try_enqueue_reflex_task(
                store,
                result.task_data,
                &result.goal_key,
                result.reflex_instance_id,
                &result.builder_name,
                stale_ms,
            )
            .await
            {
                EnqueueOutcome::Enqueued { task_id } => {
                    reflex.on_enqueued(result.reflex_instance_id, &task_id, &self.emitter).await;
                }
                EnqueueOutcome::Skipped { reason, existing_task_id, error } => {
                    if let Some(error) = &error {
                        warn!(reflex = reflex.name(), %error, "reflex task enqueue failed");
                    }
                    reflex.on_skipped(result.reflex_instance_id, reason, existing_task_id, &self.emitter).await;
                }
            }

            return TickOutcome { fired: true, reflex_name: Some(reflex.name().to_string()) };
        }

        TickOutcome { fired: false, reflex_name: None }
    }

    /// Dispatch a task's terminal transition to the controller whose
    /// `builder_name` matches, by inspecting `metadata.task_provenance`.
    /// Silently no-ops if no reflex claims the builder name.
    pub async fn on_task_terminal(
        &self,
        task: &Task,
        after_sample: Option<&WorldSample>,
        recorder: &dyn ProofRecorder,
        run_id: &str,
    ) {
        let Some(metadata) = &task.metadata else { return };
        let builder = metadata.task_provenance.builder.as_str();

        if let Some(reflex) = self.reflexes.iter().find(|r| r.builder_name() == builder) {
            reflex.on_task_terminal(task, after_sample, &self.emitter, recorder, run_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{CacheError, EnqueueError, TaskQueryError};
    use crate::domain::models::{
        InventoryItem, Step, StepMeta, TaskData, TaskMetadata, TaskProvenance, TaskStatus,
    };
    use crate::services::config::{ExplorationConfig, HungerConfig, SleepConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFetcher(WorldSample);

    #[async_trait]
    impl WorldStateFetcher for FixedFetcher {
        async fn fetch_world_state(&self) -> Result<WorldSample, CacheError> {
            Ok(self.0.clone())
        }
    }

    struct RecordingStore {
        outstanding: Vec<Task>,
        add_calls: AtomicUsize,
    }

    #[async_trait]
    impl TaskStore for RecordingStore {
        async fn add_task(&self, data: TaskData, metadata: TaskMetadata) -> Result<Task, EnqueueError> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Task {
                id: format!("t-{}", self.add_calls.load(Ordering::SeqCst)),
                status: TaskStatus::Pending,
                metadata: Some(metadata),
                created_at: chrono::Utc::now(),
                updated_at: None,
                steps: data.steps,
            })
        }

        async fn get_tasks(&self, _status: Option<&[TaskStatus]>) -> Result<Vec<Task>, TaskQueryError> {
            Ok(self.outstanding.clone())
        }
    }

    struct NoopRecorder;
    #[async_trait]
    impl ProofRecorder for NoopRecorder {
        async fn record_reflex_proof(&self, _run_id: &str, _bundle: crate::domain::models::ProofBundle) {}
    }

    fn registry(sample: WorldSample) -> ReflexRegistry<FixedFetcher> {
        let cache = WorldStateCache::new(Arc::new(FixedFetcher(sample)), 4_000);
        ReflexRegistry::new(
            cache,
            Arc::new(HungerController::new(HungerConfig::default(), 30, 50)),
            Arc::new(SleepController::new(SleepConfig::default())),
            Arc::new(ExplorationController::new(ExplorationConfig::default(), 30, 50)),
            LifecycleEmitter::new(200),
        )
    }

    #[tokio::test]
    async fn unavailable_state_short_circuits_with_no_fire() {
        struct FailingFetcher;
        #[async_trait]
        impl WorldStateFetcher for FailingFetcher {
            async fn fetch_world_state(&self) -> Result<WorldSample, CacheError> {
                Err(CacheError::FetchFailed("down".to_string()))
            }
        }
        let cache = WorldStateCache::new(Arc::new(FailingFetcher), 4_000);
        let registry = ReflexRegistry::new(
            cache,
            Arc::new(HungerController::new(HungerConfig::default(), 30, 50)),
            Arc::new(SleepController::new(SleepConfig::default())),
            Arc::new(ExplorationController::new(ExplorationConfig::default(), 30, 50)),
            LifecycleEmitter::new(200),
        );
        let store = RecordingStore { outstanding: vec![], add_calls: AtomicUsize::new(0) };
        let outcome = registry.evaluate_tick(Some("no_tasks"), &store, 300_000, false).await;
        assert_eq!(outcome, TickOutcome { fired: false, reflex_name: None });
        assert_eq!(store.add_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn highest_priority_reflex_wins_and_short_circuits() {
        let sample = WorldSample {
            food: Some(5.0),
            inventory: Some(vec![InventoryItem { name: "bread".to_string(), count: 5 }]),
            time_of_day: Some(18_000),
            nearby_hostiles: Some(0),
            ..Default::default()
        };
        let registry = registry(sample);
        let store = RecordingStore { outstanding: vec![], add_calls: AtomicUsize::new(0) };

        let outcome = registry.evaluate_tick(Some("no_tasks"), &store, 300_000, false).await;
        assert!(outcome.fired);
        assert_eq!(outcome.reflex_name.as_deref(), Some("hunger"));
        assert_eq!(store.add_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dry_run_fires_without_enqueueing() {
        let sample = WorldSample {
            food: Some(5.0),
            inventory: Some(vec![InventoryItem { name: "bread".to_string(), count: 5 }]),
            ..Default::default()
        };
        let registry = registry(sample);
        let store = RecordingStore { outstanding: vec![], add_calls: AtomicUsize::new(0) };

        let outcome = registry.evaluate_tick(Some("no_tasks"), &store, 300_000, true).await;
        assert!(outcome.fired);
        assert_eq!(store.add_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_idle_skips_non_preemptible_reflexes() {
        let sample = WorldSample {
            food: Some(10.0),
            inventory: Some(vec![InventoryItem { name: "bread".to_string(), count: 5 }]),
            time_of_day: Some(18_000),
            nearby_hostiles: Some(0),
            ..Default::default()
        };
        let registry = registry(sample);
        let store = RecordingStore { outstanding: vec![], add_calls: AtomicUsize::new(0) };

        // Not idle (idle_reason = None): hunger isn't critical here, so
        // it won't fire anyway, but sleep/exploration are skipped
        // outright for not being preemptible.
        let outcome = registry.evaluate_tick(None, &store, 300_000, false).await;
        assert!(!outcome.fired);
    }

    #[tokio::test]
    async fn terminal_dispatch_is_by_builder_name() {
        let registry = registry(WorldSample::default());
        let task = Task {
            id: "t-1".to_string(),
            status: TaskStatus::Completed,
            metadata: Some(TaskMetadata {
                goal_key: "explore:wander".to_string(),
                reflex_instance_id: uuid::Uuid::new_v4(),
                task_provenance: TaskProvenance { builder: "exploration".to_string(), source: "autonomous".to_string() },
            }),
            created_at: chrono::Utc::now(),
            updated_at: Some(chrono::Utc::now()),
            steps: vec![Step {
                id: uuid::Uuid::new_v4(),
                label: "move".to_string(),
                order: 0,
                done: true,
                meta: StepMeta { leaf: "move_to".to_string(), args: Default::default(), executable: true },
            }],
        };
        let recorder = NoopRecorder;
        // Exploration has no on_task_terminal bridge; this must not panic.
        registry.on_task_terminal(&task, None, &recorder, "run-1").await;
    }

    #[tokio::test]
    async fn unknown_builder_is_silently_ignored() {
        let registry = registry(WorldSample::default());
        let task = Task {
            id: "t-2".to_string(),
            status: TaskStatus::Completed,
            metadata: Some(TaskMetadata {
                goal_key: "unknown:key".to_string(),
                reflex_instance_id: uuid::Uuid::new_v4(),
                task_provenance: TaskProvenance { builder: "mystery".to_string(), source: "autonomous".to_string() },
            }),
            created_at: chrono::Utc::now(),
            updated_at: Some(chrono::Utc::now()),
            steps: vec![],
        };
        let recorder = NoopRecorder;
        registry.on_task_terminal(&task, None, &recorder, "run-1").await;
    }
}
