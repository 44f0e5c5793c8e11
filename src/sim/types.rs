//! Per-cycle records produced by the simulation engine.

use std::fmt;

use chrono::NaiveDateTime;

use crate::sim::controller::{CycleOutcome, Direction};
use crate::sim::soc_area::SocArea;

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Dispatched,
    OffGrid,
    Aborted,
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleStatus::Dispatched => "dispatched",
            CycleStatus::OffGrid => "off_grid",
            CycleStatus::Aborted => "aborted",
        })
    }
}

/// State of one storage unit after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitRecord {
    /// Set-point written by the controller (W), if any.
    pub setpoint_w: Option<i32>,
    /// Active power actually applied (W).
    pub applied_w: i32,
    /// State of charge after applying (percent).
    pub soc: i32,
    pub ready: bool,
}

/// Complete record of one simulated control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub cycle: usize,
    pub time: NaiveDateTime,
    /// Site load (W).
    pub load_w: i32,
    /// Production (W, positive).
    pub production_w: i32,
    /// Grid exchange after applying the storage power (W, positive = import).
    pub grid_w: i32,
    pub status: CycleStatus,
    pub direction: Option<Direction>,
    pub main_area: Option<SocArea>,
    pub support_area: Option<SocArea>,
    /// Power the storage units were asked to deliver in total (W).
    pub required_w: Option<i32>,
    /// Storage-side grid target of a charge cycle (W, negative = draw).
    pub target_grid_w: Option<i32>,
    pub main: UnitRecord,
    pub support: UnitRecord,
    /// Why the cycle was aborted.
    pub error: Option<String>,
}

impl CycleRecord {
    /// Fills the controller-related fields from a cycle outcome.
    pub fn with_outcome(mut self, outcome: &CycleOutcome) -> Self {
        match outcome {
            CycleOutcome::OffGrid => self.status = CycleStatus::OffGrid,
            CycleOutcome::Dispatched(ctx) => {
                self.status = CycleStatus::Dispatched;
                self.direction = Some(ctx.direction);
                self.main_area = Some(ctx.main_area);
                self.support_area = Some(ctx.support_area);
                self.required_w = Some(ctx.required_w);
                self.target_grid_w = ctx.target_grid_setpoint_w;
                self.main.setpoint_w = Some(ctx.main_w);
                self.support.setpoint_w = Some(ctx.support_w);
            }
        }
        self
    }
}

impl fmt::Display for CycleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let area = |a: Option<SocArea>| a.map_or_else(|| "-".to_string(), |a| a.to_string());
        write!(
            f,
            "#{:>4} {} | load={:>8} W  pv={:>8} W  grid={:>8} W | {:<10} \
             main={:>8} W ({:>3}% {:<6}) support={:>8} W ({:>3}% {:<6})",
            self.cycle,
            self.time.format("%Y-%m-%d %H:%M:%S"),
            self.load_w,
            self.production_w,
            self.grid_w,
            self.status,
            self.main.applied_w,
            self.main.soc,
            area(self.main_area),
            self.support.applied_w,
            self.support.soc,
            area(self.support_area),
        )?;
        if let Some(err) = &self.error {
            write!(f, " | {err}")?;
        }
        Ok(())
    }
}
