use super::rounding::round_to;
use super::sample::{is_usable_for_integration, EntityPowerSeries, Sample};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const MAX_GAP_HOURS: f64 = 24.0;

/// Total energy of independent power series using the trapezoidal rule.
///
/// Only consecutive samples of the same entity are paired. A pair is skipped when either
/// reading is unusable, when time does not move forward, or when the gap exceeds 24 hours.
/// With power in watts the result is in watt-hours, rounded to 6 decimals.
pub fn integrate(entities: &[EntityPowerSeries]) -> f64 {
    // fold from +0.0: an empty f64 `sum()` yields -0.0.
    let total = entities
        .iter()
        .map(|entity| integrate_series(&entity.series))
        .fold(0.0, |acc, energy| acc + energy);
    round_to(total, 6)
}

fn integrate_series(series: &[Sample]) -> f64 {
    series
        .windows(2)
        .filter_map(|pair| trapezoid(&pair[0], &pair[1]))
        .fold(0.0, |acc, energy| acc + energy)
}

fn trapezoid(current: &Sample, next: &Sample) -> Option<f64> {
    if !is_usable_for_integration(current) || !is_usable_for_integration(next) {
        return None;
    }

    let delta_hours =
        (next.timestamp - current.timestamp).num_milliseconds() as f64 / MILLIS_PER_HOUR;
    if delta_hours <= 0.0 || delta_hours > MAX_GAP_HOURS {
        return None;
    }

    Some(((current.value + next.value) / 2.0) * delta_hours)
}
