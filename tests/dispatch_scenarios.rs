//! Integration tests for single dispatch cycles over simulated storage units.

mod common;

use chrono::TimeDelta;
use ess_dispatch::devices::envelope::ReadinessTiming;
use ess_dispatch::devices::types::ManagedEss;
use ess_dispatch::error::DispatchError;
use ess_dispatch::sim::controller::{
    CycleOutcome, DispatchContext, DispatchController, DispatchSettings, Direction,
};
use ess_dispatch::sim::grid_mode::GridMode;
use ess_dispatch::sim::registry::ComponentRegistry;
use ess_dispatch::sim::soc_area::SocArea;
use tempfile::TempDir;

use common::{MAIN_ID, SUPPORT_ID};

fn dispatch(
    registry: &mut ComponentRegistry,
    settings: DispatchSettings,
    consumption_w: i32,
    production_w: i32,
    now: chrono::NaiveDateTime,
) -> DispatchContext {
    let mut controller = DispatchController::new(settings);
    match controller.run(registry, &common::sum(consumption_w, production_w), now) {
        Ok(CycleOutcome::Dispatched(ctx)) => ctx,
        other => panic!("expected a dispatched cycle, got {other:?}"),
    }
}

fn applied(registry: &ComponentRegistry, id: &str) -> Option<i32> {
    registry.simulated_ess(id).and_then(|ess| ess.active_power())
}

#[test]
fn slow_main_ramp_shifts_charge_to_support() {
    // Both RED, main ramps 20 kW per cycle.
    let mut registry = common::hybrid_registry(5, 5, 20_000);
    let ctx = dispatch(&mut registry, common::settings(), 0, 0, common::start());

    assert_eq!(ctx.direction, Direction::Charge);
    assert_eq!((ctx.main_area, ctx.support_area), (SocArea::Red, SocArea::Red));
    assert_eq!(ctx.target_grid_setpoint_w, Some(-200_000));
    assert_eq!((ctx.main_request_w, ctx.support_request_w), (-100_000, -100_000));
    assert_eq!((ctx.main_w, ctx.support_w), (-20_000, -180_000));

    common::apply_all(&mut registry, common::start());
    assert_eq!(applied(&registry, MAIN_ID), Some(-20_000));
    assert_eq!(applied(&registry, SUPPORT_ID), Some(-180_000));
}

#[test]
fn unclamped_red_units_share_grid_power_evenly() {
    let mut registry = common::hybrid_registry(5, 5, 300_000);
    let ctx = dispatch(&mut registry, common::settings(), 0, 0, common::start());
    assert_eq!((ctx.main_w, ctx.support_w), (-100_000, -100_000));
    assert_eq!(ctx.main_w + ctx.support_w, ctx.required_w);
}

#[test]
fn red_support_takes_the_larger_charge_share() {
    // main ORANGE, support RED
    let mut registry = common::hybrid_registry(40, 5, 300_000);
    let ctx = dispatch(&mut registry, common::settings(), 0, 0, common::start());

    assert_eq!((ctx.main_area, ctx.support_area), (SocArea::Orange, SocArea::Red));
    assert_eq!(ctx.split.value(), 0.3);
    assert_eq!((ctx.main_w, ctx.support_w), (-60_000, -140_000));
}

#[test]
fn green_main_covers_small_discharge_alone() {
    let mut registry = common::hybrid_registry(80, 80, 300_000);
    let ctx = dispatch(&mut registry, common::settings(), 60_000, 0, common::start());

    assert_eq!(ctx.direction, Direction::Discharge);
    assert_eq!((ctx.main_w, ctx.support_w), (60_000, 0));

    common::apply_all(&mut registry, common::start());
    assert_eq!(applied(&registry, MAIN_ID), Some(60_000));
    assert_eq!(applied(&registry, SUPPORT_ID), Some(0));
}

#[test]
fn orange_main_shares_discharge_by_table() {
    // main ORANGE, support GREEN: main share 0.3
    let mut registry = common::hybrid_registry(40, 80, 300_000);
    let ctx = dispatch(&mut registry, common::settings(), 50_000, 0, common::start());
    assert_eq!(ctx.split.value(), 0.3);
    assert_eq!((ctx.main_w, ctx.support_w), (15_000, 35_000));
}

#[test]
fn power_forecast_sets_grid_target_net_of_production() {
    let dir = TempDir::new().unwrap();
    let power = common::write_forecast(
        dir.path(),
        "power.csv",
        &[(common::at(10, 0), common::at(11, 0), -50_000)],
    );
    let settings = DispatchSettings {
        power_prediction: Some(power),
        ..common::settings()
    };

    // Both ORANGE, stored energy above the default reserve.
    let mut registry = common::hybrid_registry(40, 40, 300_000);
    let ctx = dispatch(&mut registry, settings, 0, 10_000, common::at(10, 30));

    assert_eq!(ctx.target_grid_setpoint_w, Some(-50_000));
    assert_eq!(ctx.required_w, -60_000);
    assert_eq!((ctx.main_w, ctx.support_w), (-30_000, -30_000));
}

#[test]
fn forecast_outside_its_window_falls_back_to_zero_target() {
    let dir = TempDir::new().unwrap();
    let power = common::write_forecast(
        dir.path(),
        "power.csv",
        &[(common::at(10, 0), common::at(11, 0), -50_000)],
    );
    let settings = DispatchSettings {
        power_prediction: Some(power),
        ..common::settings()
    };

    let mut registry = common::hybrid_registry(40, 40, 300_000);
    let ctx = dispatch(&mut registry, settings, 0, 0, common::at(12, 0));
    assert_eq!(ctx.predicted_power_w, None);
    assert_eq!(ctx.target_grid_setpoint_w, Some(0));
    assert_eq!((ctx.main_w, ctx.support_w), (0, 0));
}

#[test]
fn missing_forecast_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = DispatchSettings {
        energy_prediction: Some(dir.path().join("absent.csv")),
        power_prediction: Some(dir.path().join("absent.csv")),
        ..common::settings()
    };

    let mut registry = common::hybrid_registry(40, 40, 300_000);
    let ctx = dispatch(&mut registry, settings, 0, 0, common::at(10, 30));
    assert_eq!(ctx.minimum_energy_wh, Some(100_000));
    assert_eq!(ctx.target_grid_setpoint_w, Some(0));
}

#[test]
fn energy_forecast_above_stored_energy_forces_full_charge() {
    let dir = TempDir::new().unwrap();
    // 40% of 400 kWh plus 40% of 276 kWh is 270.4 kWh.
    let energy = common::write_forecast(
        dir.path(),
        "energy.csv",
        &[(common::at(10, 0), common::at(11, 0), 300_000)],
    );
    let settings = DispatchSettings {
        energy_prediction: Some(energy),
        ..common::settings()
    };

    let mut registry = common::hybrid_registry(40, 40, 300_000);
    let ctx = dispatch(&mut registry, settings, 0, 0, common::at(10, 30));
    assert_eq!(ctx.minimum_energy_wh, Some(300_000));
    assert_eq!(ctx.target_grid_setpoint_w, Some(-200_000));
    assert_eq!((ctx.main_w, ctx.support_w), (-100_000, -100_000));
}

#[test]
fn off_grid_units_receive_no_set_points() {
    let mut main = common::unit_params(MAIN_ID, common::MAIN_CAPACITY_WH, 50, 300_000);
    let mut support = common::unit_params(SUPPORT_ID, common::SUPPORT_CAPACITY_WH, 50, 300_000);
    main.grid_mode = GridMode::OffGrid;
    support.grid_mode = GridMode::OffGrid;
    let mut registry = common::registry_with(main, support);

    let mut controller = DispatchController::new(common::settings());
    let outcome = controller
        .run(&mut registry, &common::sum(50_000, 0), common::start())
        .unwrap();
    assert_eq!(outcome, CycleOutcome::OffGrid);

    common::apply_all(&mut registry, common::start());
    assert_eq!(applied(&registry, MAIN_ID), Some(0));
    assert_eq!(applied(&registry, SUPPORT_ID), Some(0));
}

#[test]
fn mixed_grid_modes_dispatch_as_undefined() {
    let main = common::unit_params(MAIN_ID, common::MAIN_CAPACITY_WH, 80, 300_000);
    let mut support = common::unit_params(SUPPORT_ID, common::SUPPORT_CAPACITY_WH, 80, 300_000);
    support.grid_mode = GridMode::OffGrid;
    let mut registry = common::registry_with(main, support);

    let ctx = dispatch(&mut registry, common::settings(), 60_000, 0, common::start());
    assert_eq!(ctx.grid_mode, GridMode::Undefined);
    assert_eq!(ctx.main_w, 60_000);
}

#[test]
fn missing_support_unit_aborts_without_partial_writes() {
    let mut registry = common::hybrid_registry(5, 5, 300_000);
    let mut controller = DispatchController::new(common::settings());
    controller
        .run(&mut registry, &common::sum(0, 0), common::start())
        .unwrap();
    common::apply_all(&mut registry, common::start());
    assert_eq!(applied(&registry, MAIN_ID), Some(-100_000));

    registry.remove_ess(SUPPORT_ID);
    let next = common::later(common::start(), 60);
    let err = controller
        .run(&mut registry, &common::sum(0, 0), next)
        .unwrap_err();
    assert!(matches!(err, DispatchError::ComponentNotFound { ref id } if id == SUPPORT_ID));

    // Without a set-point the main unit falls back to zero.
    common::apply_all(&mut registry, next);
    assert_eq!(applied(&registry, MAIN_ID), Some(0));
}

#[test]
fn disabled_main_unit_aborts_the_cycle() {
    let mut main = common::unit_params(MAIN_ID, common::MAIN_CAPACITY_WH, 50, 300_000);
    main.enabled = false;
    let support = common::unit_params(SUPPORT_ID, common::SUPPORT_CAPACITY_WH, 50, 300_000);
    let mut registry = common::registry_with(main, support);

    let mut controller = DispatchController::new(common::settings());
    let err = controller
        .run(&mut registry, &common::sum(10_000, 0), common::start())
        .unwrap_err();
    assert!(matches!(err, DispatchError::ComponentDisabled { ref id } if id == MAIN_ID));
}

#[test]
fn one_unit_cannot_be_main_and_support() {
    let mut registry = common::hybrid_registry(50, 50, 300_000);
    let settings = DispatchSettings {
        support_ess_id: MAIN_ID.to_string(),
        ..common::settings()
    };
    let mut controller = DispatchController::new(settings);
    let err = controller
        .run(&mut registry, &common::sum(10_000, 0), common::start())
        .unwrap_err();
    assert!(matches!(err, DispatchError::SharedComponent { .. }));
}

#[test]
fn missing_meter_aborts_the_cycle() {
    let mut registry = common::hybrid_registry(50, 50, 300_000);
    let settings = DispatchSettings {
        meter_id: "other".to_string(),
        ..common::settings()
    };
    let mut controller = DispatchController::new(settings);
    let err = controller
        .run(&mut registry, &common::sum(10_000, 0), common::start())
        .unwrap_err();
    assert!(matches!(err, DispatchError::ComponentNotFound { .. }));
}

#[test]
fn starting_main_hands_its_share_to_support_until_ready() {
    let mut main = common::unit_params(MAIN_ID, common::MAIN_CAPACITY_WH, 5, 300_000);
    main.timing = ReadinessTiming::new(TimeDelta::seconds(5), None);
    let support = common::unit_params(SUPPORT_ID, common::SUPPORT_CAPACITY_WH, 5, 300_000);
    let mut registry = common::registry_with(main, support);
    let mut controller = DispatchController::new(common::settings());

    let t0 = common::start();
    for ess in registry.all_ess_mut() {
        ess.on_cycle(t0);
    }
    let ctx = controller
        .run(&mut registry, &common::sum(0, 0), t0)
        .unwrap()
        .context()
        .cloned()
        .unwrap();
    assert_eq!(ctx.main_request_w, -100_000);
    assert_eq!((ctx.main_w, ctx.support_w), (0, -200_000));
    common::apply_all(&mut registry, t0);

    let t1 = common::later(t0, 5);
    for ess in registry.all_ess_mut() {
        ess.on_cycle(t1);
    }
    assert!(registry.simulated_ess(MAIN_ID).unwrap().readiness().is_ready());
    let ctx = controller
        .run(&mut registry, &common::sum(0, 0), t1)
        .unwrap()
        .context()
        .cloned()
        .unwrap();
    assert_eq!((ctx.main_w, ctx.support_w), (-100_000, -100_000));
}
