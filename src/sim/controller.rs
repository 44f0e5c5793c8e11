//! Per-cycle dispatch of a main and a support storage unit.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::devices::types::ManagedEss;
use crate::error::{DispatchError, Result};
use crate::forecast::PredictionStore;
use crate::sim::grid_mode::GridMode;
use crate::sim::registry::Registry;
use crate::sim::soc_area::{SocArea, stored_energy_wh};
use crate::sim::split_table::{SplitFraction, SplitTable};
use crate::sim::sum::Aggregates;

/// Settings of a [`DispatchController`].
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub main_ess_id: String,
    pub support_ess_id: String,
    pub meter_id: String,
    /// Minimum energy reserve used when no energy forecast applies, in Wh.
    pub default_minimum_energy_wh: i32,
    /// Largest power drawn from the grid for charging, in W.
    pub max_grid_power_w: i32,
    /// Share of the main unit's apparent power below which it discharges alone.
    pub net_power_threshold: f64,
    /// Forecast of the minimum energy reserve (Wh).
    pub energy_prediction: Option<PathBuf>,
    /// Forecast of the grid set-point while charging (W).
    pub power_prediction: Option<PathBuf>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            main_ess_id: "ess0".to_string(),
            support_ess_id: "ess1".to_string(),
            meter_id: "meter0".to_string(),
            default_minimum_energy_wh: 100_000,
            max_grid_power_w: 200_000,
            net_power_threshold: 0.8,
            energy_prediction: None,
            power_prediction: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Charge,
    Discharge,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Charge => f.write_str("charge"),
            Direction::Discharge => f.write_str("discharge"),
        }
    }
}

/// Everything decided during one dispatched cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchContext {
    pub now: NaiveDateTime,
    pub grid_mode: GridMode,
    pub direction: Direction,
    /// Grid meter reading, for the record only.
    pub grid_power_w: Option<i32>,
    pub consumption_w: i32,
    /// Production used for charging; undefined production counts as zero.
    pub production_w: i32,
    pub main_area: SocArea,
    pub support_area: SocArea,
    /// Resolved minimum energy reserve (charge cycles only).
    pub minimum_energy_wh: Option<i32>,
    /// Power forecast value, before it is limited to charging (charge cycles only).
    pub predicted_power_w: Option<i32>,
    /// Grid set-point aimed for (charge cycles only).
    pub target_grid_setpoint_w: Option<i32>,
    pub required_w: i32,
    pub split: SplitFraction,
    /// Main share of the required power before envelope clamping.
    pub main_request_w: i32,
    /// Support share of the required power before envelope clamping.
    pub support_request_w: i32,
    /// Set-point written to the main unit.
    pub main_w: i32,
    /// Set-point written to the support unit.
    pub support_w: i32,
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Both units are off-grid; no set-points were written.
    OffGrid,
    Dispatched(DispatchContext),
}

impl CycleOutcome {
    pub fn context(&self) -> Option<&DispatchContext> {
        match self {
            CycleOutcome::OffGrid => None,
            CycleOutcome::Dispatched(ctx) => Some(ctx),
        }
    }
}

/// Splits the site's charge or discharge power between a main and a support
/// storage unit based on their SoC areas.
///
/// Components are resolved through the [`Registry`] on every cycle. The
/// controller only keeps its settings, the split policy and the forecast
/// caches between cycles.
#[derive(Debug, Clone)]
pub struct DispatchController {
    settings: DispatchSettings,
    table: SplitTable,
    energy_forecast: Option<PredictionStore>,
    power_forecast: Option<PredictionStore>,
}

/// Readings taken once at the start of a cycle.
struct Snapshot {
    main_area: SocArea,
    support_area: SocArea,
    total_stored_wh: i64,
}

impl DispatchController {
    pub fn new(settings: DispatchSettings) -> Self {
        let energy_forecast = settings.energy_prediction.clone().map(PredictionStore::new);
        let power_forecast = settings.power_prediction.clone().map(PredictionStore::signed);
        Self {
            settings,
            table: SplitTable::default(),
            energy_forecast,
            power_forecast,
        }
    }

    #[must_use]
    pub fn with_split_table(mut self, table: SplitTable) -> Self {
        self.table = table;
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Runs one control cycle.
    ///
    /// # Arguments
    ///
    /// * `registry` - Resolves the configured units and meter
    /// * `sum` - Site aggregate readings
    /// * `now` - Cycle timestamp
    ///
    /// # Errors
    ///
    /// Any error aborts this cycle only. Errors raised before emission leave
    /// both units without set-points; see [`DispatchError::PartialEmission`]
    /// for failures during emission.
    pub fn run(
        &mut self,
        registry: &mut dyn Registry,
        sum: &dyn Aggregates,
        now: NaiveDateTime,
    ) -> Result<CycleOutcome> {
        let grid_power_w = registry.meter(&self.settings.meter_id)?.active_power();
        let [main, support] =
            registry.ess_pair(&self.settings.main_ess_id, &self.settings.support_ess_id)?;

        let grid_mode = GridMode::combine([main.grid_mode(), support.grid_mode()]);
        match grid_mode {
            GridMode::OffGrid => {
                debug!(%now, "off-grid, no dispatch");
                return Ok(CycleOutcome::OffGrid);
            }
            GridMode::Undefined => warn!(%now, "grid mode is undefined, dispatching as on-grid"),
            GridMode::OnGrid => {}
        }

        let snapshot = self.snapshot(&*main, &*support)?;
        let consumption_w = sum
            .consumption_active_power()
            .ok_or_else(|| DispatchError::undefined("sum", "consumption active power"))?;

        let mut ctx = DispatchContext {
            now,
            grid_mode,
            direction: Direction::Charge,
            grid_power_w,
            consumption_w,
            production_w: 0,
            main_area: snapshot.main_area,
            support_area: snapshot.support_area,
            minimum_energy_wh: None,
            predicted_power_w: None,
            target_grid_setpoint_w: None,
            required_w: 0,
            split: SplitFraction::ALL_MAIN,
            main_request_w: 0,
            support_request_w: 0,
            main_w: 0,
            support_w: 0,
        };

        if consumption_w > 0 {
            self.plan_discharge(&mut ctx, &*main)?;
        } else {
            self.plan_charge(&mut ctx, &snapshot, sum);
            ctx.split = self.table.charge_split(ctx.main_area, ctx.support_area)?;
        }

        let (main_request_w, support_request_w) = ctx.split.split(ctx.required_w);
        ctx.main_request_w = main_request_w;
        ctx.support_request_w = support_request_w;

        // Whatever the main unit cannot take this cycle moves to the support unit.
        ctx.main_w = main.filter_power(main_request_w, now);
        ctx.support_w = support.filter_power(ctx.required_w - ctx.main_w, now);

        emit(main, support, ctx.main_w, ctx.support_w)?;

        debug!(
            %now,
            direction = %ctx.direction,
            required_w = ctx.required_w,
            main_area = %ctx.main_area,
            support_area = %ctx.support_area,
            split = ctx.split.value(),
            main_w = ctx.main_w,
            support_w = ctx.support_w,
            "dispatched"
        );
        Ok(CycleOutcome::Dispatched(ctx))
    }

    fn snapshot(&self, main: &dyn ManagedEss, support: &dyn ManagedEss) -> Result<Snapshot> {
        let minimum = i64::from(self.settings.default_minimum_energy_wh);
        Ok(Snapshot {
            main_area: SocArea::of_unit(main, minimum)?,
            support_area: SocArea::of_unit(support, minimum)?,
            total_stored_wh: stored_energy_wh(main)? + stored_energy_wh(support)?,
        })
    }

    fn plan_discharge(&self, ctx: &mut DispatchContext, main: &dyn ManagedEss) -> Result<()> {
        ctx.direction = Direction::Discharge;
        ctx.required_w = ctx.consumption_w;

        // Without a known apparent power the main unit never runs alone.
        let main_alone = main.max_apparent_power().is_some_and(|max| {
            f64::from(ctx.required_w) < self.settings.net_power_threshold * f64::from(max)
        }) && ctx.main_area == SocArea::Green;

        ctx.split = if main_alone {
            SplitFraction::ALL_MAIN
        } else {
            self.table.discharge_split(ctx.main_area, ctx.support_area)?
        };
        Ok(())
    }

    fn plan_charge(&mut self, ctx: &mut DispatchContext, snapshot: &Snapshot, sum: &dyn Aggregates) {
        ctx.direction = Direction::Charge;

        let minimum_wh = self
            .energy_forecast
            .as_mut()
            .and_then(|store| store.lookup(ctx.now))
            .unwrap_or(self.settings.default_minimum_energy_wh);
        ctx.minimum_energy_wh = Some(minimum_wh);

        let reserve_missed = i64::from(minimum_wh) >= snapshot.total_stored_wh;
        let any_red = snapshot.main_area == SocArea::Red || snapshot.support_area == SocArea::Red;

        let mut target_w = if reserve_missed || any_red {
            self.settings.max_grid_power_w.saturating_neg()
        } else {
            ctx.predicted_power_w = self
                .power_forecast
                .as_mut()
                .and_then(|store| store.lookup(ctx.now));
            ctx.predicted_power_w.unwrap_or(0)
        };
        if target_w > 0 {
            info!(now = %ctx.now, predicted_w = target_w, "ignoring discharge recommendation during charge");
            target_w = 0;
        }
        ctx.target_grid_setpoint_w = Some(target_w);

        ctx.production_w = sum.production_active_power().unwrap_or_else(|| {
            warn!(now = %ctx.now, "production active power undefined, assuming none");
            0
        });
        ctx.required_w = target_w.saturating_sub(ctx.production_w);
    }
}

/// Writes one unit's set-points; a unit that rejects any of them keeps none.
fn write_set_points(ess: &mut dyn ManagedEss, active_w: i32) -> Result<()> {
    let written = ess
        .set_active_power_equals(active_w)
        .and_then(|()| ess.set_reactive_power_equals(0));
    if written.is_err() {
        ess.clear_set_points();
    }
    written
}

/// Emits both set-points or neither.
fn emit(main: &mut dyn ManagedEss, support: &mut dyn ManagedEss, main_w: i32, support_w: i32) -> Result<()> {
    write_set_points(main, main_w)?;
    if let Err(err) = write_set_points(support, support_w) {
        main.clear_set_points();
        return Err(DispatchError::PartialEmission {
            applied: main.id().to_string(),
            failed: support.id().to_string(),
            reason: err.to_string(),
        });
    }
    Ok(())
}
