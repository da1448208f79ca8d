//! World-state sample and the normalised homeostasis signal vector.
//!
//! `WorldSample` is a snapshot from the external embodied agent; every
//! field is optional because any sensor can be unavailable on a given
//! tick. Consumers must treat an absent field they depend on as a
//! fail-closed "do not act" signal rather than imputing a value.

use serde::{Deserialize, Serialize};

/// A single inventory slot: an item name and its stack count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub count: u32,
}

/// A 3-D block-space position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Snapshot of the external agent's world state. All fields are
/// optional: absence means "unknown", never "zero" or "default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSample {
    pub position: Option<Position>,
    /// Health, 0-20.
    pub health: Option<f64>,
    /// Food level, 0-20.
    pub food: Option<f64>,
    pub inventory: Option<Vec<InventoryItem>>,
    /// Current time of day, in Minecraft ticks (0..24000).
    pub time_of_day: Option<u32>,
    pub biome: Option<String>,
    pub nearby_hostiles: Option<u32>,
    pub nearby_passives: Option<u32>,
}

impl WorldSample {
    /// Ticks `[12542, 23460]` are night per the Minecraft day/night cycle.
    pub const NIGHT_START_TICK: u32 = 12542;
    pub const NIGHT_END_TICK: u32 = 23460;

    /// Whether `time_of_day` falls within the night window. Returns
    /// `None` (unknown) rather than a default when the field is absent.
    pub fn is_night(&self) -> Option<bool> {
        self.time_of_day
            .map(|t| (Self::NIGHT_START_TICK..=Self::NIGHT_END_TICK).contains(&t))
    }

    /// Count in inventory of an item recognised as food, or `None` if
    /// inventory is unavailable.
    pub fn food_item_count(&self, name: &str) -> Option<u32> {
        self.inventory
            .as_ref()
            .map(|items| items.iter().filter(|i| i.name == name).map(|i| i.count).sum())
    }
}

/// Normalised `[0, 1]` homeostasis view derived from a `WorldSample`.
///
/// Polarity is explicit per field: `hunger` is a *deficit* (1 =
/// urgent); the rest are *satisfaction* (1 = good). Each value is
/// rounded to two decimals. A field stays `None` when its inputs are
/// unavailable — this struct never imputes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalVector {
    pub health: Option<f64>,
    pub hunger: Option<f64>,
    pub energy: Option<f64>,
    pub safety: Option<f64>,
    pub defensive_readiness: Option<f64>,
}

/// Round to two decimal places, the precision mandated for signal
/// vector fields.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_night_unknown_without_time_of_day() {
        let sample = WorldSample::default();
        assert_eq!(sample.is_night(), None);
    }

    #[test]
    fn is_night_true_within_window() {
        let sample = WorldSample {
            time_of_day: Some(18_000),
            ..Default::default()
        };
        assert_eq!(sample.is_night(), Some(true));
    }

    #[test]
    fn is_night_false_outside_window() {
        let sample = WorldSample {
            time_of_day: Some(1_000),
            ..Default::default()
        };
        assert_eq!(sample.is_night(), Some(false));
    }

    #[test]
    fn food_item_count_sums_matching_stacks() {
        let sample = WorldSample {
            inventory: Some(vec![
                InventoryItem { name: "bread".to_string(), count: 3 },
                InventoryItem { name: "bread".to_string(), count: 2 },
                InventoryItem { name: "apple".to_string(), count: 1 },
            ]),
            ..Default::default()
        };
        assert_eq!(sample.food_item_count("bread"), Some(5));
        assert_eq!(sample.food_item_count("apple"), Some(1));
        assert_eq!(sample.food_item_count("cooked_beef"), Some(0));
    }

    #[test]
    fn food_item_count_unknown_without_inventory() {
        let sample = WorldSample::default();
        assert_eq!(sample.food_item_count("bread"), None);
    }

    #[test]
    fn round2_rounds_correctly() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.124), 0.12);
    }
}
