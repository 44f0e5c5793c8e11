use chrono::{NaiveDateTime, Timelike};
use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::gaussian_noise;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Position of `now` within its day, in `[0, 1)`.
pub(crate) fn day_fraction(now: NaiveDateTime) -> f64 {
    f64::from(now.num_seconds_from_midnight()) / SECONDS_PER_DAY
}

/// Site consumption generator with a daily sinusoidal pattern.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ess_dispatch::devices::load::LoadProfile;
///
/// let mut load = LoadProfile::new(80_000.0, 40_000.0, 0.0, 0.0, 42);
/// let noon = NaiveDate::from_ymd_opt(2022, 12, 8)
///     .and_then(|d| d.and_hms_opt(12, 0, 0))
///     .unwrap();
/// assert!(load.demand_w(noon) >= 0);
/// ```
#[derive(Debug, Clone)]
pub struct LoadProfile {
    /// Mean consumption in W.
    pub base_w: f64,

    /// Amplitude of the daily variation in W.
    pub amp_w: f64,

    /// Phase offset in radians (0 = rising through the mean at midnight).
    pub phase_rad: f64,

    /// Standard deviation of the Gaussian noise in W.
    pub noise_std_w: f64,

    rng: StdRng,
}

impl LoadProfile {
    pub fn new(base_w: f64, amp_w: f64, phase_rad: f64, noise_std_w: f64, seed: u64) -> Self {
        Self {
            base_w,
            amp_w,
            phase_rad,
            noise_std_w: noise_std_w.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Consumption at `now` in W, never negative.
    pub fn demand_w(&mut self, now: NaiveDateTime) -> i32 {
        let angle = 2.0 * std::f64::consts::PI * day_fraction(now) + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std_w);
        let watts = self.base_w + self.amp_w * angle.sin() + noise;
        watts.max(0.0).round() as i32
    }
}
