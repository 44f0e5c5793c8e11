//! Share of the required power assigned to the main unit, by SoC area.

use crate::error::{DispatchError, Result};
use crate::sim::soc_area::SocArea;

/// Fraction in `[0, 1]` of the required power assigned to the main unit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SplitFraction(f64);

impl SplitFraction {
    /// The main unit takes everything.
    pub const ALL_MAIN: Self = Self(1.0);

    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidSplitFraction`] for values outside
    /// `[0, 1]` or NaN. Out-of-range fractions are never clamped.
    pub fn new(fraction: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&fraction) {
            Ok(Self(fraction))
        } else {
            Err(DispatchError::InvalidSplitFraction(fraction))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Splits `required_w` into `(main, support)`.
    ///
    /// The main share is truncated towards zero and the support unit gets the
    /// remainder, so both parts always add up to `required_w`.
    pub fn split(self, required_w: i32) -> (i32, i32) {
        let main = (self.0 * f64::from(required_w)) as i32;
        (main, required_w - main)
    }
}

/// A 3x3 matrix indexed by `[support area][main area]`.
pub type AreaMatrix = [[f64; 3]; 3];

/// Charge and discharge split policy.
///
/// Both default matrices favour the unit in the worse SoC area: it is charged
/// first and discharged last.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTable {
    charge: AreaMatrix,
    discharge: AreaMatrix,
}

impl SplitTable {
    pub const CHARGE: AreaMatrix = [
        // main:  RED  ORANGE GREEN
        [0.5, 0.3, 0.0], // support RED
        [0.7, 0.5, 0.2], // support ORANGE
        [1.0, 0.8, 0.5], // support GREEN
    ];

    pub const DISCHARGE: AreaMatrix = [
        [0.5, 0.8, 1.0],
        [0.2, 0.5, 0.7],
        [0.0, 0.3, 0.5],
    ];

    /// Builds a table from custom matrices.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidSplitFraction`] for the first cell
    /// outside `[0, 1]`.
    pub fn new(charge: AreaMatrix, discharge: AreaMatrix) -> Result<Self> {
        for cell in charge.iter().chain(discharge.iter()).flatten() {
            SplitFraction::new(*cell)?;
        }
        Ok(Self { charge, discharge })
    }

    pub fn charge_split(&self, main: SocArea, support: SocArea) -> Result<SplitFraction> {
        SplitFraction::new(self.charge[support.index()][main.index()])
    }

    pub fn discharge_split(&self, main: SocArea, support: SocArea) -> Result<SplitFraction> {
        SplitFraction::new(self.discharge[support.index()][main.index()])
    }
}

impl Default for SplitTable {
    fn default() -> Self {
        Self {
            charge: Self::CHARGE,
            discharge: Self::DISCHARGE,
        }
    }
}
