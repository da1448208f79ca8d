//! Bounded in-memory log of reflex lifecycle events.
//!
//! A ring buffer over `ReflexLifecycleEvent`, capped and oldest-first
//! evicting the same way the teacher's `AuditLogService` bounds its
//! entry deque. Controllers are handed a `&LifecycleEmitter` and push
//! events through it rather than emitting directly to an external
//! recorder, so tests can filter the recorded log by instance or type.

use std::collections::VecDeque;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::ReflexLifecycleEvent;

/// Capped, oldest-first-evicting log of lifecycle events.
pub struct LifecycleEmitter {
    capacity: usize,
    events: RwLock<VecDeque<ReflexLifecycleEvent>>,
}

impl LifecycleEmitter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: RwLock::new(VecDeque::new()),
        }
    }

    /// Record an event, evicting the oldest entry if at capacity.
    pub async fn emit(&self, event: ReflexLifecycleEvent) {
        let mut events = self.events.write().await;
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Snapshot copy of every retained event, oldest first.
    pub async fn snapshot(&self) -> Vec<ReflexLifecycleEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    /// Snapshot filtered to one reflex instance.
    pub async fn snapshot_for_instance(&self, reflex_instance_id: Uuid) -> Vec<ReflexLifecycleEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.reflex_instance_id() == reflex_instance_id)
            .cloned()
            .collect()
    }

    /// Snapshot filtered by the event's wire type tag (e.g. `"task_enqueued"`).
    pub async fn snapshot_of_type(&self, type_name: &str) -> Vec<ReflexLifecycleEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.type_name() == type_name)
            .cloned()
            .collect()
    }
}
