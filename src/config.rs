//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Deserialize;
use thiserror::Error;

use crate::devices::envelope::{PowerLimits, ReadinessTiming};
use crate::devices::ess::{EssParams, SimulatedEss};
use crate::devices::load::LoadProfile;
use crate::devices::meter::SimulatedMeter;
use crate::devices::production::ProductionProfile;
use crate::sim::clock::CycleClock;
use crate::sim::controller::{DispatchController, DispatchSettings};
use crate::sim::engine::Engine;
use crate::sim::grid_mode::GridMode;
use crate::sim::registry::ComponentRegistry;

/// Seed offset for the production RNG so it does not mirror the load noise.
const PRODUCTION_SEED_OFFSET: u64 = 1;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the `hybrid` preset. Load from TOML
/// with [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::hybrid`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Cycle timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Dispatch controller parameters.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Storage units (`[[ess]]` tables).
    #[serde(default = "default_units")]
    pub ess: Vec<EssConfig>,
    #[serde(default)]
    pub meter: MeterConfig,
    /// Site consumption profile.
    #[serde(default)]
    pub load: LoadConfig,
    /// Site production profile.
    #[serde(default)]
    pub production: ProductionConfig,
}

/// Cycle timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Timestamp of the first cycle, as a quoted ISO-8601 local date-time
    /// (`"2022-12-08T09:00:00"`).
    pub start: NaiveDateTime,
    /// Cycle period in seconds (must be > 0).
    pub cycle_secs: u64,
    /// Number of cycles to run (must be > 0).
    pub cycles: usize,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2022, 12, 8)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap_or_default(),
            cycle_secs: 60,
            cycles: 1_440,
            seed: 42,
        }
    }
}

/// Dispatch controller parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub main_ess_id: String,
    pub support_ess_id: String,
    pub meter_id: String,
    /// Minimum energy reserve when no energy forecast applies (Wh).
    pub default_minimum_energy_wh: i32,
    /// Largest grid draw for charging (W).
    pub max_grid_power_w: i32,
    /// CSV forecast of the minimum energy reserve.
    pub energy_prediction: Option<PathBuf>,
    /// CSV forecast of the grid set-point while charging.
    pub power_prediction: Option<PathBuf>,
    /// Share of the main unit's apparent power it serves alone (0.0-1.0].
    pub net_power_threshold: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let settings = DispatchSettings::default();
        Self {
            main_ess_id: settings.main_ess_id,
            support_ess_id: settings.support_ess_id,
            meter_id: settings.meter_id,
            default_minimum_energy_wh: settings.default_minimum_energy_wh,
            max_grid_power_w: settings.max_grid_power_w,
            energy_prediction: None,
            power_prediction: None,
            net_power_threshold: settings.net_power_threshold,
        }
    }
}

impl From<&ControllerConfig> for DispatchSettings {
    fn from(c: &ControllerConfig) -> Self {
        Self {
            main_ess_id: c.main_ess_id.clone(),
            support_ess_id: c.support_ess_id.clone(),
            meter_id: c.meter_id.clone(),
            default_minimum_energy_wh: c.default_minimum_energy_wh,
            max_grid_power_w: c.max_grid_power_w,
            net_power_threshold: c.net_power_threshold,
            energy_prediction: c.energy_prediction.clone(),
            power_prediction: c.power_prediction.clone(),
        }
    }
}

/// Storage unit parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EssConfig {
    pub id: String,
    pub enabled: bool,
    /// Usable capacity (Wh).
    pub capacity_wh: i32,
    /// State of charge at start-up (percent, 0-100).
    pub initial_soc: i32,
    /// Charge power limit (W, positive magnitude).
    pub max_charge_power_w: i32,
    /// Discharge power limit (W), also the unit's maximum apparent power.
    pub max_discharge_power_w: i32,
    /// Maximum change of power per cycle (W).
    pub ramp_rate_w: i32,
    /// Delay from the first request until the unit delivers power (ms).
    pub response_time_ms: u64,
    /// Idle time after which the unit shuts down (s). Absent: never.
    pub inactivity_timeout_s: Option<u64>,
    pub grid_mode: GridMode,
}

impl Default for EssConfig {
    fn default() -> Self {
        Self {
            id: "ess0".to_string(),
            enabled: true,
            capacity_wh: 100_000,
            initial_soc: 50,
            max_charge_power_w: 50_000,
            max_discharge_power_w: 50_000,
            ramp_rate_w: 10_000,
            response_time_ms: 0,
            inactivity_timeout_s: None,
            grid_mode: GridMode::OnGrid,
        }
    }
}

impl EssConfig {
    /// Redox-flow main unit of the hybrid preset.
    pub fn redox() -> Self {
        Self {
            id: "ess0".to_string(),
            capacity_wh: 400_000,
            initial_soc: 30,
            max_charge_power_w: 100_000,
            max_discharge_power_w: 100_000,
            ramp_rate_w: 20_000,
            response_time_ms: 2_000,
            ..Self::default()
        }
    }

    /// Lithium-ion support unit of the hybrid preset.
    pub fn lithium() -> Self {
        Self {
            id: "ess1".to_string(),
            capacity_wh: 276_000,
            initial_soc: 50,
            max_charge_power_w: 300_000,
            max_discharge_power_w: 300_000,
            ramp_rate_w: 100_000,
            ..Self::default()
        }
    }

    pub fn to_params(&self) -> EssParams {
        EssParams {
            id: self.id.clone(),
            enabled: self.enabled,
            capacity_wh: self.capacity_wh,
            initial_soc: self.initial_soc,
            limits: PowerLimits::new(self.max_charge_power_w, self.max_discharge_power_w),
            ramp_rate_w: self.ramp_rate_w,
            timing: ReadinessTiming::new(
                duration_ms(self.response_time_ms),
                self.inactivity_timeout_s
                    .map(|secs| duration_ms(secs.saturating_mul(1_000))),
            ),
            grid_mode: self.grid_mode,
        }
    }
}

fn duration_ms(ms: u64) -> TimeDelta {
    TimeDelta::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

fn default_units() -> Vec<EssConfig> {
    vec![EssConfig::redox(), EssConfig::lithium()]
}

/// Grid meter parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeterConfig {
    pub id: String,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            id: "meter0".to_string(),
        }
    }
}

/// Site consumption profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Mean consumption (W).
    pub base_w: f64,
    /// Daily amplitude (W).
    pub amp_w: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Gaussian noise standard deviation (W).
    pub noise_std_w: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_w: 80_000.0,
            amp_w: 40_000.0,
            phase_rad: -1.2,
            noise_std_w: 2_000.0,
        }
    }
}

/// Site production profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductionConfig {
    /// Output at solar noon (W).
    pub peak_w: f64,
    /// Sunrise hour of day (inclusive).
    pub sunrise_hour: f64,
    /// Sunset hour of day (exclusive).
    pub sunset_hour: f64,
    /// Relative noise standard deviation.
    pub noise_std: f64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            peak_w: 150_000.0,
            sunrise_hour: 7.0,
            sunset_hour: 17.0,
            noise_std: 0.05,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"ess[0].initial_soc"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the hybrid preset: a 400 kWh redox main unit and a 276 kWh
    /// lithium-ion support unit.
    pub fn hybrid() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            controller: ControllerConfig::default(),
            ess: default_units(),
            meter: MeterConfig::default(),
            load: LoadConfig::default(),
            production: ProductionConfig::default(),
        }
    }

    /// Returns the sluggish-main preset: the main unit needs 30 s to start,
    /// ramps slowly and shuts down after five idle minutes.
    pub fn sluggish_main() -> Self {
        Self {
            simulation: SimulationConfig {
                cycle_secs: 5,
                cycles: 720,
                ..SimulationConfig::default()
            },
            ess: vec![
                EssConfig {
                    ramp_rate_w: 5_000,
                    response_time_ms: 30_000,
                    inactivity_timeout_s: Some(300),
                    ..EssConfig::redox()
                },
                EssConfig::lithium(),
            ],
            ..Self::hybrid()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["hybrid", "sluggish_main"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "hybrid" => Ok(Self::hybrid()),
            "sluggish_main" => Ok(Self::sluggish_main()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if s.cycle_secs == 0 {
            errors.push(ConfigError::new("simulation.cycle_secs", "must be > 0"));
        }
        if s.cycles == 0 {
            errors.push(ConfigError::new("simulation.cycles", "must be > 0"));
        }

        let c = &self.controller;
        if c.main_ess_id == c.support_ess_id {
            errors.push(ConfigError::new(
                "controller.support_ess_id",
                "must differ from controller.main_ess_id",
            ));
        }
        for (field, id) in [
            ("controller.main_ess_id", &c.main_ess_id),
            ("controller.support_ess_id", &c.support_ess_id),
        ] {
            if !self.ess.iter().any(|e| &e.id == id) {
                errors.push(ConfigError::new(field, format!("no [[ess]] with id \"{id}\"")));
            }
        }
        if c.meter_id != self.meter.id {
            errors.push(ConfigError::new("controller.meter_id", "must match meter.id"));
        }
        if c.default_minimum_energy_wh < 0 {
            errors.push(ConfigError::new("controller.default_minimum_energy_wh", "must be >= 0"));
        }
        if c.max_grid_power_w < 0 {
            errors.push(ConfigError::new("controller.max_grid_power_w", "must be >= 0"));
        }
        if !(c.net_power_threshold > 0.0 && c.net_power_threshold <= 1.0) {
            errors.push(ConfigError::new(
                "controller.net_power_threshold",
                "must be in (0.0, 1.0]",
            ));
        }

        let mut seen = HashSet::new();
        for (i, e) in self.ess.iter().enumerate() {
            if !seen.insert(e.id.as_str()) {
                errors.push(ConfigError::new(
                    format!("ess[{i}].id"),
                    format!("duplicate id \"{}\"", e.id),
                ));
            }
            if e.capacity_wh <= 0 {
                errors.push(ConfigError::new(format!("ess[{i}].capacity_wh"), "must be > 0"));
            }
            if !(0..=100).contains(&e.initial_soc) {
                errors.push(ConfigError::new(
                    format!("ess[{i}].initial_soc"),
                    "must be in [0, 100]",
                ));
            }
            for (name, value) in [
                ("max_charge_power_w", e.max_charge_power_w),
                ("max_discharge_power_w", e.max_discharge_power_w),
                ("ramp_rate_w", e.ramp_rate_w),
            ] {
                if value < 0 {
                    errors.push(ConfigError::new(format!("ess[{i}].{name}"), "must be >= 0"));
                }
            }
        }

        let p = &self.production;
        if !(0.0..=24.0).contains(&p.sunrise_hour) || !(0.0..=24.0).contains(&p.sunset_hour) {
            errors.push(ConfigError::new(
                "production.sunrise_hour",
                "sunrise and sunset must be within [0, 24]",
            ));
        }
        if p.sunrise_hour >= p.sunset_hour {
            errors.push(ConfigError::new(
                "production.sunrise_hour",
                "must be < production.sunset_hour",
            ));
        }
        if p.peak_w < 0.0 {
            errors.push(ConfigError::new("production.peak_w", "must be >= 0"));
        }
        if self.load.noise_std_w < 0.0 || p.noise_std < 0.0 {
            errors.push(ConfigError::new("load.noise_std_w", "noise must be >= 0"));
        }

        errors
    }

    /// Builds the component registry described by `[[ess]]` and `[meter]`.
    pub fn build_registry(&self) -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        for unit in &self.ess {
            registry.insert_ess(SimulatedEss::new(unit.to_params()));
        }
        registry.insert_meter(SimulatedMeter::new(self.meter.id.clone()));
        registry
    }

    /// Builds a ready-to-run engine.
    ///
    /// # Errors
    ///
    /// Returns every validation error if the configuration is invalid.
    pub fn build_engine(&self) -> Result<Engine, Vec<ConfigError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let s = &self.simulation;
        let l = &self.load;
        let p = &self.production;
        let period = duration_ms(s.cycle_secs.saturating_mul(1_000));

        Ok(Engine::new(
            self.build_registry(),
            DispatchController::new(DispatchSettings::from(&self.controller)),
            LoadProfile::new(l.base_w, l.amp_w, l.phase_rad, l.noise_std_w, s.seed),
            ProductionProfile::new(
                p.peak_w,
                p.sunrise_hour,
                p.sunset_hour,
                p.noise_std,
                s.seed.wrapping_add(PRODUCTION_SEED_OFFSET),
            ),
            CycleClock::new(s.start, period, s.cycles),
        ))
    }
}
