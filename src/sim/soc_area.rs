//! Three-level urgency classification of a unit's stored energy.

use std::fmt;

use crate::devices::types::ManagedEss;
use crate::error::{DispatchError, Result};

/// SoC urgency of a storage unit, from most to least urgent.
///
/// The discriminant is the row/column index into the split tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SocArea {
    Red = 0,
    Orange = 1,
    Green = 2,
}

impl SocArea {
    /// Classifies a stored energy against the minimum reserve and capacity.
    ///
    /// A unit holding exactly half the minimum energy is already `Orange`;
    /// exactly half the capacity is still `Orange`.
    ///
    /// # Arguments
    ///
    /// * `stored_wh` - Energy currently stored
    /// * `minimum_wh` - Minimum energy reserve of the site
    /// * `capacity_wh` - Usable capacity of the unit
    pub fn classify(stored_wh: i64, minimum_wh: i64, capacity_wh: i64) -> SocArea {
        if 2 * stored_wh < minimum_wh {
            SocArea::Red
        } else if 2 * stored_wh <= capacity_wh {
            SocArea::Orange
        } else {
            SocArea::Green
        }
    }

    /// Classifies a unit from its live SoC and capacity readings.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UndefinedValue`] if the unit reports no SoC or
    /// no capacity.
    pub fn of_unit(ess: &dyn ManagedEss, minimum_wh: i64) -> Result<SocArea> {
        let capacity = ess
            .capacity()
            .ok_or_else(|| DispatchError::undefined(ess.id(), "capacity"))?;
        let stored = stored_energy_wh(ess)?;
        Ok(Self::classify(stored, minimum_wh, i64::from(capacity)))
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SocArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocArea::Red => "RED",
            SocArea::Orange => "ORANGE",
            SocArea::Green => "GREEN",
        };
        f.write_str(name)
    }
}

/// Energy stored in a unit, `capacity * soc / 100`, in Wh.
///
/// # Errors
///
/// Returns [`DispatchError::UndefinedValue`] if SoC or capacity is undefined.
pub fn stored_energy_wh(ess: &dyn ManagedEss) -> Result<i64> {
    let capacity = ess
        .capacity()
        .ok_or_else(|| DispatchError::undefined(ess.id(), "capacity"))?;
    let soc = ess
        .soc()
        .ok_or_else(|| DispatchError::undefined(ess.id(), "soc"))?;
    Ok(i64::from(capacity) * i64::from(soc) / 100)
}
