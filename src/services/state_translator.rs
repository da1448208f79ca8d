//! Pure map from a `WorldSample` to a `SignalVector`.
//!
//! No I/O, no state. Every output field is omitted rather than
//! imputed when its inputs are unavailable.

use crate::domain::models::world::round2;
use crate::domain::models::{SignalVector, WorldSample};

/// Translate a raw world sample into the normalised homeostasis view.
pub fn translate(sample: &WorldSample) -> SignalVector {
    let health_signal = sample.health.map(|h| round2((h / 20.0).clamp(0.0, 1.0)));
    let hunger_signal = sample.food.map(|f| round2((1.0 - f / 20.0).clamp(0.0, 1.0)));

    let safety = sample.nearby_hostiles.map(|hostiles| {
        let night_penalty = if sample.is_night().unwrap_or(false) { 0.1 } else { 0.0 };
        let raw = 0.9 - 0.15 * f64::from(hostiles) - night_penalty;
        round2(raw.clamp(0.0, 1.0))
    });

    let energy = match (health_signal, hunger_signal) {
        (Some(h), Some(hunger)) => Some(round2((h + (1.0 - hunger)) / 2.0)),
        _ => None,
    };

    let defensive_readiness = sample
        .nearby_hostiles
        .map(|hostiles| round2(1.0 - (f64::from(hostiles) / 5.0).min(1.0)));

    SignalVector {
        health: health_signal,
        hunger: hunger_signal,
        energy,
        safety,
        defensive_readiness,
    }
}
