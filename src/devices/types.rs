//! Common types and traits for controllable storage units and meters.

use chrono::NaiveDateTime;
use rand::{Rng, rngs::StdRng};

use crate::devices::envelope::PowerEnvelope;
use crate::error::Result;
use crate::sim::grid_mode::GridMode;

/// A battery unit that accepts active/reactive power set-points.
///
/// Readings follow the channel convention: `None` means the value is
/// currently undefined and callers must decide what that implies.
///
/// # Power Convention
/// - Positive: discharging
/// - Negative: charging
pub trait ManagedEss {
    /// Component identifier used by the registry.
    fn id(&self) -> &str;

    /// Disabled units are not resolvable.
    fn is_enabled(&self) -> bool;

    fn grid_mode(&self) -> GridMode;

    /// State of charge in percent (0..=100).
    fn soc(&self) -> Option<i32>;

    /// Usable capacity in Wh.
    fn capacity(&self) -> Option<i32>;

    /// Last applied active power in W.
    fn active_power(&self) -> Option<i32>;

    /// Largest power the unit can deliver, in W.
    fn max_apparent_power(&self) -> Option<i32>;

    /// Feasible power range for the current cycle.
    fn envelope(&self) -> PowerEnvelope;

    /// Clamps `target_w` into what the unit can deliver this cycle.
    ///
    /// Requesting nonzero power from a unit that is not ready yet returns `0`
    /// and starts its response timer.
    fn filter_power(&mut self, target_w: i32, now: NaiveDateTime) -> i32;

    /// Writes the active power set-point for this cycle. Last write wins.
    fn set_active_power_equals(&mut self, watts: i32) -> Result<()>;

    /// Writes the reactive power set-point for this cycle. Last write wins.
    fn set_reactive_power_equals(&mut self, watts: i32) -> Result<()>;

    /// Discards set-points written during the current cycle.
    fn clear_set_points(&mut self);
}

/// A grid connection point meter.
pub trait Meter {
    fn id(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Power at the grid connection point in W (positive = buy from grid).
    fn active_power(&self) -> Option<i32>;
}

/// Gaussian noise via the Box-Muller transform.
///
/// Returns `0.0` for a non-positive standard deviation without touching the
/// generator.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn zero_std_dev_yields_no_noise() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
        assert_eq!(gaussian_noise(&mut rng, -1.0), 0.0);
    }

    #[test]
    fn noise_is_reproducible_for_a_seed() {
        let mut a = StdRng::seed_from_u64(11);
        let mut b = StdRng::seed_from_u64(11);
        for _ in 0..10 {
            assert_eq!(gaussian_noise(&mut a, 0.1), gaussian_noise(&mut b, 0.1));
        }
    }
}
