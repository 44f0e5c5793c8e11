use chrono::{NaiveDateTime, TimeDelta};

/// Fixed-period clock producing the timestamps of consecutive control cycles.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use ess_dispatch::sim::clock::CycleClock;
///
/// let start = NaiveDate::from_ymd_opt(2022, 12, 8)
///     .and_then(|d| d.and_hms_opt(9, 0, 0))
///     .unwrap();
/// let mut clock = CycleClock::new(start, TimeDelta::seconds(1), 3);
/// let mut cycles = Vec::new();
///
/// clock.run(|cycle, _now| cycles.push(cycle));
/// assert_eq!(cycles, vec![0, 1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct CycleClock {
    start: NaiveDateTime,
    period: TimeDelta,
    current: usize,
    total: usize,
}

impl CycleClock {
    /// # Arguments
    ///
    /// * `start` - Timestamp of the first cycle
    /// * `period` - Time between two cycles
    /// * `total` - Number of cycles the clock produces
    pub fn new(start: NaiveDateTime, period: TimeDelta, total: usize) -> Self {
        Self {
            start,
            period,
            current: 0,
            total,
        }
    }

    /// Timestamp of the given cycle index.
    pub fn time_of(&self, cycle: usize) -> NaiveDateTime {
        let offset = i32::try_from(cycle).unwrap_or(i32::MAX);
        self.start + self.period * offset
    }

    /// Advances the clock by one cycle.
    ///
    /// # Returns
    ///
    /// * `Some((cycle, now))` - The cycle index (starting from 0) and its timestamp
    /// * `None` - If all cycles have run
    pub fn tick(&mut self) -> Option<(usize, NaiveDateTime)> {
        if self.current < self.total {
            let cycle = self.current;
            self.current += 1;
            Some((cycle, self.time_of(cycle)))
        } else {
            None
        }
    }

    /// Runs `f` for each remaining cycle.
    pub fn run(&mut self, mut f: impl FnMut(usize, NaiveDateTime)) {
        while let Some((cycle, now)) = self.tick() {
            f(cycle, now);
        }
    }
}
