use chrono::NaiveDateTime;
use rand::{SeedableRng, rngs::StdRng};

use crate::devices::load::day_fraction;
use crate::devices::types::gaussian_noise;

/// Photovoltaic production with a half-sine daylight profile.
///
/// Production is reported as a positive power in W, matching the aggregate
/// `productionActivePower` value.
#[derive(Debug, Clone)]
pub struct ProductionProfile {
    /// Output at solar noon under ideal conditions, in W.
    pub peak_w: f64,

    /// Sunrise as hour of day (inclusive).
    pub sunrise_hour: f64,

    /// Sunset as hour of day (exclusive).
    pub sunset_hour: f64,

    /// Relative noise, e.g. `0.05` for roughly +/-5%.
    pub noise_std: f64,

    rng: StdRng,
}

impl ProductionProfile {
    /// # Panics
    ///
    /// Panics if `sunrise_hour >= sunset_hour` or either lies outside `0..=24`.
    pub fn new(peak_w: f64, sunrise_hour: f64, sunset_hour: f64, noise_std: f64, seed: u64) -> Self {
        assert!((0.0..=24.0).contains(&sunrise_hour) && (0.0..=24.0).contains(&sunset_hour));
        assert!(sunrise_hour < sunset_hour);
        Self {
            peak_w: peak_w.max(0.0),
            sunrise_hour,
            sunset_hour,
            noise_std: noise_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fraction of peak output at `now`, in `[0, 1]`.
    pub fn daylight_frac(&self, now: NaiveDateTime) -> f64 {
        let hour = day_fraction(now) * 24.0;
        if hour < self.sunrise_hour || hour >= self.sunset_hour {
            return 0.0;
        }
        let pos = (hour - self.sunrise_hour) / (self.sunset_hour - self.sunrise_hour);
        (std::f64::consts::PI * pos).sin().max(0.0)
    }

    /// Production at `now` in W.
    pub fn power_w(&mut self, now: NaiveDateTime) -> i32 {
        let frac = self.daylight_frac(now);
        if frac <= 0.0 {
            return 0;
        }
        let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        (self.peak_w * frac * noise_mult).max(0.0).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 6, 21)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn no_production_at_night() {
        let mut pv = ProductionProfile::new(50_000.0, 6.0, 18.0, 0.1, 42);
        assert_eq!(pv.power_w(at(0)), 0);
        assert_eq!(pv.power_w(at(5)), 0);
        assert_eq!(pv.power_w(at(18)), 0);
        assert_eq!(pv.power_w(at(23)), 0);
    }

    #[test]
    fn noiseless_peak_at_solar_noon() {
        let mut pv = ProductionProfile::new(50_000.0, 6.0, 18.0, 0.0, 42);
        assert_eq!(pv.power_w(at(12)), 50_000);
        assert!(pv.power_w(at(9)) < 50_000);
        assert!(pv.power_w(at(9)) > 0);
    }

    #[test]
    #[should_panic]
    fn inverted_daylight_window_panics() {
        ProductionProfile::new(1_000.0, 18.0, 6.0, 0.0, 1);
    }
}
