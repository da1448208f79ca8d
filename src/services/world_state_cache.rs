//! Single-flight, TTL-bounded world-state cache.
//!
//! The tick interval (~5s) is longer than the TTL (~4s default),
//! guaranteeing at most one fetch per tick; single-flight join
//! prevents a thundering herd when several reflexes in the same tick
//! would otherwise each trigger their own fetch. Fail-closed: any
//! fetcher error returns "unavailable" rather than stale or
//! fabricated data, and is never retained — the next `get()` retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, instrument, warn};

use crate::domain::error::CacheError;
use crate::domain::models::WorldSample;
use crate::domain::ports::WorldStateFetcher;

type FetchOutcome = Result<WorldSample, CacheError>;

struct CacheState {
    cached: Option<(WorldSample, DateTime<Utc>)>,
    in_flight: Option<broadcast::Sender<FetchOutcome>>,
}

/// TTL-bounded single-flight cache over a `WorldStateFetcher`.
pub struct WorldStateCache<F: WorldStateFetcher> {
    fetcher: Arc<F>,
    ttl_ms: i64,
    state: Mutex<CacheState>,
}

impl<F: WorldStateFetcher> WorldStateCache<F> {
    pub fn new(fetcher: Arc<F>, ttl_ms: i64) -> Self {
        Self {
            fetcher,
            ttl_ms,
            state: Mutex::new(CacheState { cached: None, in_flight: None }),
        }
    }

    /// Return a fresh-enough snapshot, joining an in-flight fetch if
    /// one is already running, or returning `None` ("unavailable") on
    /// any fetcher error.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Option<WorldSample> {
        let mut receiver = {
            let mut state = self.state.lock().await;

            if let Some((sample, cached_at)) = &state.cached {
                if Utc::now() - *cached_at < chrono::Duration::milliseconds(self.ttl_ms) {
                    return Some(sample.clone());
                }
            }

            if let Some(sender) = &state.in_flight {
                sender.subscribe()
            } else {
                let (sender, receiver) = broadcast::channel(1);
                state.in_flight = Some(sender);
                drop(state);
                self.run_fetch().await;
                receiver
            }
        };

        match receiver.recv().await {
            Ok(Ok(sample)) => Some(sample),
            Ok(Err(err)) => {
                warn!(error = %err, "world-state fetch failed, returning unavailable");
                None
            }
            Err(_) => {
                warn!("single-flight fetch channel closed before completion");
                None
            }
        }
    }

    /// Clear the cached value and any in-flight handle. The next
    /// `get()` fetches unconditionally.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.cached = None;
        state.in_flight = None;
    }

    async fn run_fetch(&self) {
        let outcome = self.fetcher.fetch_world_state().await;
        debug!(ok = outcome.is_ok(), "world-state fetch completed");

        let mut state = self.state.lock().await;
        let sender = state.in_flight.take();

        if let Ok(sample) = &outcome {
            state.cached = Some((sample.clone(), Utc::now()));
        }
        drop(state);

        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}
