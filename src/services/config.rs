//! Configuration for the reflex core's tunables.
//!
//! Every numeric default here is the one named by the spec. The crate
//! exposes no file/env loader (no-CLI non-goal), but the shape matches
//! what a config layer would deserialize: plain structs with
//! `Default` impls, grouped by subsystem.

use serde::{Deserialize, Serialize};

/// World-state cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache freshness window, in milliseconds.
    pub ttl_ms: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_ms: 4_000 }
    }
}

/// Hunger reflex tuning, over raw food units (0-20).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HungerConfig {
    pub trigger_threshold: f64,
    pub reset_threshold: f64,
    pub critical_threshold: f64,
}

impl Default for HungerConfig {
    fn default() -> Self {
        Self {
            trigger_threshold: 12.0,
            reset_threshold: 16.0,
            critical_threshold: 5.0,
        }
    }
}

/// Exploration reflex tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Idle ticks required before firing (default 6 ≈ 30s at a 5s tick).
    pub idle_ticks_to_trigger: u32,
    /// Non-idle ticks required to reset the idle counter.
    pub idle_reset_ticks: u32,
    pub cooldown_ms: i64,
    pub min_health: f64,
    pub min_food: f64,
    pub max_hostiles: u32,
    pub min_displacement: f64,
    pub max_displacement: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            idle_ticks_to_trigger: 6,
            idle_reset_ticks: 3,
            cooldown_ms: 60_000,
            min_health: 10.0,
            min_food: 6.0,
            max_hostiles: 0,
            min_displacement: 16.0,
            max_displacement: 48.0,
        }
    }
}

/// Sleep reflex tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub max_hostiles: u32,
    pub search_radius: u32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            max_hostiles: 0,
            search_radius: 32,
        }
    }
}

/// Proof accumulator map bounds, shared by every content-addressed
/// reflex (currently only hunger).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    pub ttl_minutes: i64,
    pub capacity: usize,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            capacity: 50,
        }
    }
}

/// Goal-key guard / enqueue staleness window, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub stale_ms: i64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { stale_ms: 300_000 }
    }
}

/// Bounded lifecycle event log capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    pub capacity: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self { capacity: 200 }
    }
}

/// Top-level configuration bag for the reflex core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflexConfig {
    pub cache: CacheConfig,
    pub hunger: HungerConfig,
    pub exploration: ExplorationConfig,
    pub sleep: SleepConfig,
    pub accumulator: AccumulatorConfig,
    pub guard: GuardConfig,
    pub event_log: EventLogConfig,
    /// Tick interval, in milliseconds. Must exceed `cache.ttl_ms` to
    /// guarantee at most one fetch per tick (spec.md §4.1).
    pub tick_interval_ms: i64,
}

impl Default for ReflexConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            hunger: HungerConfig::default(),
            exploration: ExplorationConfig::default(),
            sleep: SleepConfig::default(),
            accumulator: AccumulatorConfig::default(),
            guard: GuardConfig::default(),
            event_log: EventLogConfig::default(),
            tick_interval_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_interval_exceeds_cache_ttl() {
        let config = ReflexConfig::default();
        assert!(config.tick_interval_ms > config.cache.ttl_ms);
    }

    #[test]
    fn default_hunger_thresholds_are_ordered() {
        let config = HungerConfig::default();
        assert!(config.critical_threshold < config.trigger_threshold);
        assert!(config.trigger_threshold < config.reset_threshold);
    }
}
