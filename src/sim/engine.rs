//! Simulation engine that drives storage units, profiles and the controller.

use chrono::NaiveDateTime;
use tracing::warn;

use crate::devices::load::LoadProfile;
use crate::devices::production::ProductionProfile;
use crate::devices::types::ManagedEss;

use super::clock::CycleClock;
use super::controller::DispatchController;
use super::registry::ComponentRegistry;
use super::sum::Sum;
use super::types::{CycleRecord, CycleStatus, UnitRecord};

/// Simulation engine owning the components, the profiles and the controller.
///
/// Each cycle runs in a fixed order:
/// 1. every unit advances its readiness and recomputes its envelope
/// 2. load and production are sampled; aggregates and the meter are updated
/// 3. the controller runs and writes set-points
/// 4. every unit applies its set-points (none means zero) and integrates SoC
///
/// The aggregates handed to the controller are netted against each other:
/// consumption is the net load (`load - production`) and production is only
/// the surplus left after the load (`production - load`, at least zero).
/// With open envelopes the grid exchange then settles at the negated
/// storage-side target of a charge cycle and at zero while discharging.
pub struct Engine {
    registry: ComponentRegistry,
    controller: DispatchController,
    load: LoadProfile,
    production: ProductionProfile,
    clock: CycleClock,
}

impl Engine {
    /// # Arguments
    ///
    /// * `registry` - Storage units and the meter named in the controller settings
    /// * `controller` - Dispatch controller
    /// * `load` - Site consumption profile
    /// * `production` - Site production profile
    /// * `clock` - Cycle timestamps
    pub fn new(
        registry: ComponentRegistry,
        controller: DispatchController,
        load: LoadProfile,
        production: ProductionProfile,
        clock: CycleClock,
    ) -> Self {
        Self {
            registry,
            controller,
            load,
            production,
            clock,
        }
    }

    /// Executes the next cycle.
    ///
    /// # Returns
    ///
    /// The record of the cycle, or `None` once the clock has run out.
    pub fn step(&mut self) -> Option<CycleRecord> {
        let (cycle, now) = self.clock.tick()?;
        Some(self.run_cycle(cycle, now))
    }

    /// Executes all remaining cycles.
    pub fn run(&mut self) -> Vec<CycleRecord> {
        let mut records = Vec::new();
        while let Some(record) = self.step() {
            records.push(record);
        }
        records
    }

    fn run_cycle(&mut self, cycle: usize, now: NaiveDateTime) -> CycleRecord {
        // 1. Envelopes
        for ess in self.registry.all_ess_mut() {
            ess.on_cycle(now);
        }

        // 2. Readings
        let load_w = self.load.demand_w(now);
        let production_w = self.production.power_w(now);
        let ess_w = Sum::total(self.registry.all_ess().map(|ess| ess.active_power()));
        let net_load_w = load_w - production_w;
        let sum = Sum {
            consumption_active_power: Some(net_load_w),
            production_active_power: Some(net_load_w.saturating_neg().max(0)),
            ess_active_power: ess_w,
            ess_capacity: Sum::total(self.registry.all_ess().map(|ess| ess.capacity())),
        };
        let meter_id = self.controller.settings().meter_id.clone();
        if let Some(meter) = self.registry.simulated_meter_mut(&meter_id) {
            meter.set_active_power(ess_w.map(|ess| net_load_w - ess));
        }

        // 3. Dispatch
        let outcome = self.controller.run(&mut self.registry, &sum, now);

        // 4. Application
        let mut applied_total = 0i32;
        for ess in self.registry.all_ess_mut() {
            applied_total = applied_total.saturating_add(ess.apply_pending(now));
        }

        let mut record = CycleRecord {
            cycle,
            time: now,
            load_w,
            production_w,
            grid_w: net_load_w - applied_total,
            status: CycleStatus::Aborted,
            direction: None,
            main_area: None,
            support_area: None,
            required_w: None,
            target_grid_w: None,
            main: self.unit_record(&self.controller.settings().main_ess_id),
            support: self.unit_record(&self.controller.settings().support_ess_id),
            error: None,
        };
        match outcome {
            Ok(outcome) => record = record.with_outcome(&outcome),
            Err(err) => {
                warn!(cycle, %now, error = %err, "dispatch cycle aborted");
                record.error = Some(err.to_string());
            }
        }
        record
    }

    fn unit_record(&self, id: &str) -> UnitRecord {
        self.registry
            .simulated_ess(id)
            .map(|ess| UnitRecord {
                setpoint_w: None,
                applied_w: ess.active_power().unwrap_or(0),
                soc: ess.soc().unwrap_or(0),
                ready: ess.readiness().is_ready(),
            })
            .unwrap_or_default()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Mutable access, e.g. to replace or disable units between cycles.
    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }
}
