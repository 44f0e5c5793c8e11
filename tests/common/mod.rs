//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use ess_dispatch::devices::envelope::{PowerLimits, ReadinessTiming};
use ess_dispatch::devices::ess::{EssParams, SimulatedEss};
use ess_dispatch::devices::meter::SimulatedMeter;
use ess_dispatch::sim::controller::DispatchSettings;
use ess_dispatch::sim::grid_mode::GridMode;
use ess_dispatch::sim::registry::ComponentRegistry;
use ess_dispatch::sim::sum::Sum;

pub const MAIN_ID: &str = "redox";
pub const SUPPORT_ID: &str = "lion";
pub const METER_ID: &str = "grid";

/// Main unit capacity (400 kWh).
pub const MAIN_CAPACITY_WH: i32 = 400_000;
/// Support unit capacity (276 kWh).
pub const SUPPORT_CAPACITY_WH: i32 = 276_000;

/// 2022-12-08 09:00:00, the start of every fixture scenario.
pub fn start() -> NaiveDateTime {
    at(9, 0)
}

/// A time of day on the fixture date.
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 12, 8)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid timestamp")
}

/// Parameters of an always-ready unit limited to 300 kW either way.
pub fn unit_params(id: &str, capacity_wh: i32, soc: i32, ramp_rate_w: i32) -> EssParams {
    EssParams {
        id: id.to_string(),
        enabled: true,
        capacity_wh,
        initial_soc: soc,
        limits: PowerLimits::new(300_000, 300_000),
        ramp_rate_w,
        timing: ReadinessTiming::instant(),
        grid_mode: GridMode::OnGrid,
    }
}

/// Registry with a redox main unit, a lithium support unit and a grid meter.
///
/// Both units start from 0 W, so their first envelope spans `ramp` watts
/// either way (capped at 300 kW).
pub fn hybrid_registry(main_soc: i32, support_soc: i32, main_ramp_w: i32) -> ComponentRegistry {
    registry_with(
        unit_params(MAIN_ID, MAIN_CAPACITY_WH, main_soc, main_ramp_w),
        unit_params(SUPPORT_ID, SUPPORT_CAPACITY_WH, support_soc, 300_000),
    )
}

pub fn registry_with(main: EssParams, support: EssParams) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.insert_ess(SimulatedEss::new(main));
    registry.insert_ess(SimulatedEss::new(support));
    let mut meter = SimulatedMeter::new(METER_ID);
    meter.set_active_power(Some(0));
    registry.insert_meter(meter);
    registry
}

/// Controller settings naming the fixture units and meter.
pub fn settings() -> DispatchSettings {
    DispatchSettings {
        main_ess_id: MAIN_ID.to_string(),
        support_ess_id: SUPPORT_ID.to_string(),
        meter_id: METER_ID.to_string(),
        ..DispatchSettings::default()
    }
}

/// Site aggregates with the given consumption and production.
pub fn sum(consumption_w: i32, production_w: i32) -> Sum {
    Sum {
        consumption_active_power: Some(consumption_w),
        production_active_power: Some(production_w),
        ..Sum::default()
    }
}

/// Writes a forecast file with one `(start, end, value)` row per entry.
pub fn write_forecast(dir: &Path, name: &str, rows: &[(NaiveDateTime, NaiveDateTime, i32)]) -> PathBuf {
    let mut body = String::from("start,end,value\n");
    for (from, to, value) in rows {
        body.push_str(&format!(
            "{},{},{value}\n",
            from.format("%Y-%m-%dT%H:%M:%S"),
            to.format("%Y-%m-%dT%H:%M:%S"),
        ));
    }
    let path = dir.join(name);
    fs::write(&path, body).expect("write forecast file");
    path
}

/// Runs the apply step of a cycle for every unit in the registry.
pub fn apply_all(registry: &mut ComponentRegistry, now: NaiveDateTime) {
    for ess in registry.all_ess_mut() {
        ess.apply_pending(now);
    }
}

/// One cycle later than `now` for a given period in seconds.
pub fn later(now: NaiveDateTime, secs: i64) -> NaiveDateTime {
    now + TimeDelta::seconds(secs)
}
