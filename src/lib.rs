//! Dispatch core for a hybrid pair of battery storage units.
//!
//! Once per control cycle the [`sim::controller::DispatchController`] decides
//! how much active power a main and a support unit charge or discharge, based
//! on their SoC areas, optional CSV forecasts and each unit's power envelope.

pub mod config;
pub mod devices;
pub mod error;
pub mod forecast;
pub mod io;
/// Controller, engine and the pieces of a control cycle.
pub mod sim;
