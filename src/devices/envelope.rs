//! Per-cycle feasible power range of a storage unit.
//!
//! A unit can only move its output by its ramp rate per cycle and delivers
//! nothing until its response time has passed after the first request. The
//! [`PowerEnvelope`] captures the resulting bounds for one cycle; [`Readiness`]
//! is the start-up state machine that gates it.

use chrono::{NaiveDateTime, TimeDelta};

/// Closed range of power in W.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerRange {
    pub lower: i32,
    pub upper: i32,
}

impl PowerRange {
    /// The `[0, 0]` range of a unit that cannot deliver power.
    pub const ZERO: Self = Self { lower: 0, upper: 0 };

    pub fn contains(self, watts: i32) -> bool {
        self.lower <= watts && watts <= self.upper
    }

    /// Clamps `watts` into the range.
    pub fn clamp(self, watts: i32) -> i32 {
        watts.max(self.lower).min(self.upper)
    }
}

/// Absolute power limits of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerLimits {
    /// Strongest allowed charge power in W (<= 0).
    pub max_charge_w: i32,
    /// Strongest allowed discharge power in W (>= 0).
    pub max_discharge_w: i32,
}

impl PowerLimits {
    /// Builds limits from magnitudes; signs of the arguments are ignored.
    pub fn new(max_charge_w: i32, max_discharge_w: i32) -> Self {
        Self {
            max_charge_w: -max_charge_w.saturating_abs(),
            max_discharge_w: max_discharge_w.saturating_abs(),
        }
    }
}

/// Feasible charge and discharge ranges for the current cycle.
///
/// Both ranges are `[0, 0]` while the unit is not ready. Charge bounds are
/// always `<= 0` and discharge bounds always `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerEnvelope {
    pub charge: PowerRange,
    pub discharge: PowerRange,
}

impl PowerEnvelope {
    /// Envelope of a unit that is not ready.
    pub const CLOSED: Self = Self {
        charge: PowerRange::ZERO,
        discharge: PowerRange::ZERO,
    };

    /// Computes the ramp-limited envelope of a ready unit.
    ///
    /// # Arguments
    ///
    /// * `current_w` - Power applied in the previous cycle
    /// * `ramp_rate_w` - Maximum change per cycle (negative values count as zero)
    /// * `limits` - Absolute charge/discharge limits
    pub fn ramped(current_w: i32, ramp_rate_w: i32, limits: PowerLimits) -> Self {
        let ramp = ramp_rate_w.max(0);
        let down = current_w.saturating_sub(ramp);
        let up = current_w.saturating_add(ramp);

        let charge_lower = down.max(limits.max_charge_w).min(0);
        let charge_upper = up.min(0);
        let discharge_lower = down.max(0);
        let discharge_upper = up.min(limits.max_discharge_w).max(0);

        // A unit running outside its limits may only ramp back towards them.
        Self {
            charge: PowerRange {
                lower: charge_lower,
                upper: charge_upper.max(charge_lower),
            },
            discharge: PowerRange {
                lower: discharge_lower.min(discharge_upper),
                upper: discharge_upper,
            },
        }
    }

    /// Envelope for the given readiness.
    pub fn compute(ready: bool, current_w: i32, ramp_rate_w: i32, limits: PowerLimits) -> Self {
        if ready {
            Self::ramped(current_w, ramp_rate_w, limits)
        } else {
            Self::CLOSED
        }
    }

    /// Clamps a target into the discharge range (`target >= 0`) or the charge
    /// range (`target < 0`).
    pub fn clamp(&self, target_w: i32) -> i32 {
        if target_w >= 0 {
            self.discharge.clamp(target_w)
        } else {
            self.charge.clamp(target_w)
        }
    }

    pub fn is_closed(&self) -> bool {
        *self == Self::CLOSED
    }
}

/// Response time and inactivity timeout of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessTiming {
    /// Delay between the first nonzero request and the unit delivering power.
    pub response_time: TimeDelta,
    /// Idle time after which a ready unit shuts down. `None` never times out.
    pub inactivity_timeout: Option<TimeDelta>,
}

impl ReadinessTiming {
    pub fn new(response_time: TimeDelta, inactivity_timeout: Option<TimeDelta>) -> Self {
        Self {
            response_time,
            inactivity_timeout,
        }
    }

    /// A unit that is ready immediately and never shuts down.
    pub fn instant() -> Self {
        Self::new(TimeDelta::zero(), None)
    }
}

/// Start-up state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotReady,
    /// A nonzero power was requested at `since`.
    Starting { since: NaiveDateTime },
    /// Delivering power. `idle_since` is set while the applied power is zero.
    Ready { idle_since: Option<NaiveDateTime> },
}

impl Readiness {
    /// Initial state: ready right away only without a response time.
    pub fn initial(timing: &ReadinessTiming) -> Self {
        if timing.response_time <= TimeDelta::zero() {
            Self::Ready { idle_since: None }
        } else {
            Self::NotReady
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Latches the start timer when nonzero power is requested from an idle
    /// unit. Does not restart a running timer.
    #[must_use]
    pub fn request(self, now: NaiveDateTime, target_w: i32) -> Self {
        match self {
            Self::NotReady if target_w != 0 => Self::Starting { since: now },
            other => other,
        }
    }

    /// Advances the state once per cycle.
    ///
    /// # Arguments
    ///
    /// * `now` - Cycle timestamp
    /// * `applied_w` - Active power currently applied by the unit
    /// * `timing` - Response time and inactivity timeout of the unit
    #[must_use]
    pub fn advance(self, now: NaiveDateTime, applied_w: i32, timing: &ReadinessTiming) -> Self {
        match self {
            Self::NotReady => Self::NotReady,
            Self::Starting { since } => {
                if now - since >= timing.response_time {
                    Self::Ready { idle_since: None }
                } else {
                    self
                }
            }
            Self::Ready { .. } if applied_w != 0 => Self::Ready { idle_since: None },
            Self::Ready { idle_since } => {
                let idle_since = idle_since.unwrap_or(now);
                match timing.inactivity_timeout {
                    Some(timeout) if now - idle_since >= timeout => Self::NotReady,
                    _ => Self::Ready {
                        idle_since: Some(idle_since),
                    },
                }
            }
        }
    }
}
