use chrono::NaiveDateTime;

use crate::devices::envelope::{PowerEnvelope, PowerLimits, Readiness, ReadinessTiming};
use crate::devices::types::ManagedEss;
use crate::error::Result;
use crate::sim::grid_mode::GridMode;

/// Watt-milliseconds per watt-hour.
const WMS_PER_WH: i64 = 3_600 * 1_000;

/// Static parameters of a simulated storage unit.
#[derive(Debug, Clone)]
pub struct EssParams {
    pub id: String,
    pub enabled: bool,
    /// Usable capacity in Wh.
    pub capacity_wh: i32,
    /// State of charge at start-up in percent.
    pub initial_soc: i32,
    pub limits: PowerLimits,
    /// Maximum change of active power per cycle in W.
    pub ramp_rate_w: i32,
    pub timing: ReadinessTiming,
    pub grid_mode: GridMode,
}

/// Set-points written during the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SetPoints {
    active_w: Option<i32>,
    reactive_w: Option<i32>,
}

/// A simulated battery storage unit with ramp-rate and response-time dynamics.
///
/// Every unit owns its readiness timer and envelope; nothing is shared between
/// units.
///
/// # Cycle protocol
/// 1. [`SimulatedEss::on_cycle`] advances readiness and recomputes the envelope
/// 2. a controller calls [`ManagedEss::filter_power`] and writes set-points
/// 3. [`SimulatedEss::apply_pending`] applies them and integrates the SoC
#[derive(Debug, Clone)]
pub struct SimulatedEss {
    params: EssParams,
    readiness: Readiness,
    envelope: PowerEnvelope,
    /// Stored energy in watt-milliseconds.
    energy_wms: i64,
    soc: i32,
    active_power_w: i32,
    reactive_power_w: i32,
    pending: SetPoints,
    last_applied_at: Option<NaiveDateTime>,
}

impl SimulatedEss {
    /// Creates a unit at its initial state of charge.
    ///
    /// The initial SoC is clamped into `0..=100`.
    pub fn new(params: EssParams) -> Self {
        let soc = params.initial_soc.clamp(0, 100);
        let energy_wms = i64::from(params.capacity_wh.max(0)) * WMS_PER_WH * i64::from(soc) / 100;
        let readiness = Readiness::initial(&params.timing);
        let envelope = PowerEnvelope::compute(
            readiness.is_ready(),
            0,
            params.ramp_rate_w,
            params.limits,
        );
        Self {
            params,
            readiness,
            envelope,
            energy_wms,
            soc,
            active_power_w: 0,
            reactive_power_w: 0,
            pending: SetPoints::default(),
            last_applied_at: None,
        }
    }

    pub fn params(&self) -> &EssParams {
        &self.params
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Stored energy in Wh.
    pub fn energy_wh(&self) -> i64 {
        self.energy_wms / WMS_PER_WH
    }

    pub fn reactive_power(&self) -> i32 {
        self.reactive_power_w
    }

    /// Start of a cycle: advances readiness and recomputes the envelope from
    /// the power applied in the previous cycle.
    pub fn on_cycle(&mut self, now: NaiveDateTime) {
        self.readiness = self
            .readiness
            .advance(now, self.active_power_w, &self.params.timing);
        self.envelope = PowerEnvelope::compute(
            self.readiness.is_ready(),
            self.active_power_w,
            self.params.ramp_rate_w,
            self.params.limits,
        );
    }

    /// Applies the set-points written this cycle. Units without a set-point
    /// are driven to zero.
    ///
    /// # Returns
    ///
    /// The active power actually applied, in W.
    pub fn apply_pending(&mut self, now: NaiveDateTime) -> i32 {
        let pending = std::mem::take(&mut self.pending);
        self.apply_power(
            now,
            pending.active_w.unwrap_or(0),
            pending.reactive_w.unwrap_or(0),
        );
        self.active_power_w
    }

    /// Integrates the SoC over the time since the previous application and
    /// applies new active/reactive power.
    ///
    /// An empty unit refuses to discharge and a full unit refuses to charge;
    /// the refused power is coerced to zero.
    pub fn apply_power(&mut self, now: NaiveDateTime, active_w: i32, reactive_w: i32) {
        self.soc = self.integrate_soc(now);
        self.last_applied_at = Some(now);

        self.active_power_w = self.coerce_at_soc_bounds(active_w);
        self.reactive_power_w = self.coerce_at_soc_bounds(reactive_w);
    }

    fn coerce_at_soc_bounds(&self, watts: i32) -> i32 {
        if (self.soc == 0 && watts > 0) || (self.soc == 100 && watts < 0) {
            0
        } else {
            watts
        }
    }

    fn integrate_soc(&mut self, now: NaiveDateTime) -> i32 {
        let Some(last) = self.last_applied_at else {
            return self.soc;
        };
        let capacity_wms = i64::from(self.params.capacity_wh.max(0)) * WMS_PER_WH;
        if capacity_wms == 0 {
            return self.soc;
        }

        let elapsed_ms = (now - last).num_milliseconds().max(0);
        let delta_wms = i64::from(self.active_power_w) * elapsed_ms;
        self.energy_wms = (self.energy_wms - delta_wms).clamp(0, capacity_wms);

        let soc = self.energy_wms as f64 / capacity_wms as f64 * 100.0;
        (soc.round() as i32).clamp(0, 100)
    }
}

impl ManagedEss for SimulatedEss {
    fn id(&self) -> &str {
        &self.params.id
    }

    fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    fn grid_mode(&self) -> GridMode {
        self.params.grid_mode
    }

    fn soc(&self) -> Option<i32> {
        Some(self.soc)
    }

    fn capacity(&self) -> Option<i32> {
        Some(self.params.capacity_wh)
    }

    fn active_power(&self) -> Option<i32> {
        Some(self.active_power_w)
    }

    fn max_apparent_power(&self) -> Option<i32> {
        Some(self.params.limits.max_discharge_w)
    }

    fn envelope(&self) -> PowerEnvelope {
        self.envelope
    }

    fn filter_power(&mut self, target_w: i32, now: NaiveDateTime) -> i32 {
        if !self.readiness.is_ready() && target_w != 0 {
            self.readiness = self.readiness.request(now, target_w);
            return 0;
        }
        self.envelope.clamp(target_w)
    }

    fn set_active_power_equals(&mut self, watts: i32) -> Result<()> {
        self.pending.active_w = Some(watts);
        Ok(())
    }

    fn set_reactive_power_equals(&mut self, watts: i32) -> Result<()> {
        self.pending.reactive_w = Some(watts);
        Ok(())
    }

    fn clear_set_points(&mut self) {
        self.pending = SetPoints::default();
    }
}
