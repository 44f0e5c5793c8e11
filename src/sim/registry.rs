//! Lookup of live components by identifier.

use std::collections::HashMap;

use crate::devices::ess::SimulatedEss;
use crate::devices::meter::SimulatedMeter;
use crate::devices::types::{ManagedEss, Meter};
use crate::error::{DispatchError, Result};

/// Resolves component identifiers to live components.
///
/// Components are resolved again every cycle and never cached by callers,
/// since reconfiguration may replace the instance behind an identifier.
pub trait Registry {
    /// Resolves two distinct storage units at once.
    ///
    /// # Errors
    ///
    /// [`DispatchError::ComponentNotFound`] for unknown identifiers,
    /// [`DispatchError::ComponentDisabled`] for disabled units and
    /// [`DispatchError::SharedComponent`] when both identifiers are the same.
    fn ess_pair(&mut self, first: &str, second: &str) -> Result<[&mut dyn ManagedEss; 2]>;

    fn meter(&self, id: &str) -> Result<&dyn Meter>;
}

/// Registry owning the simulated storage units and meters.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    ess: HashMap<String, SimulatedEss>,
    meters: HashMap<String, SimulatedMeter>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a storage unit under its own identifier.
    pub fn insert_ess(&mut self, ess: SimulatedEss) -> Option<SimulatedEss> {
        self.ess.insert(ess.id().to_string(), ess)
    }

    pub fn insert_meter(&mut self, meter: SimulatedMeter) -> Option<SimulatedMeter> {
        self.meters.insert(meter.id().to_string(), meter)
    }

    pub fn remove_ess(&mut self, id: &str) -> Option<SimulatedEss> {
        self.ess.remove(id)
    }

    /// Direct access to a simulated unit, regardless of its enabled flag.
    pub fn simulated_ess(&self, id: &str) -> Option<&SimulatedEss> {
        self.ess.get(id)
    }

    pub fn simulated_ess_mut(&mut self, id: &str) -> Option<&mut SimulatedEss> {
        self.ess.get_mut(id)
    }

    pub fn simulated_meter_mut(&mut self, id: &str) -> Option<&mut SimulatedMeter> {
        self.meters.get_mut(id)
    }

    /// All simulated units, in no particular order.
    pub fn all_ess_mut(&mut self) -> impl Iterator<Item = &mut SimulatedEss> {
        self.ess.values_mut()
    }

    pub fn all_ess(&self) -> impl Iterator<Item = &SimulatedEss> {
        self.ess.values()
    }
}

fn check_enabled(id: &str, enabled: bool) -> Result<()> {
    if enabled {
        Ok(())
    } else {
        Err(DispatchError::ComponentDisabled { id: id.to_string() })
    }
}

fn not_found(id: &str) -> DispatchError {
    DispatchError::ComponentNotFound { id: id.to_string() }
}

impl Registry for ComponentRegistry {
    fn ess_pair(&mut self, first: &str, second: &str) -> Result<[&mut dyn ManagedEss; 2]> {
        if first == second {
            return Err(DispatchError::SharedComponent {
                id: first.to_string(),
            });
        }
        for id in [first, second] {
            let ess = self.ess.get(id).ok_or_else(|| not_found(id))?;
            check_enabled(id, ess.is_enabled())?;
        }

        let (mut a, mut b) = (None, None);
        for (id, ess) in self.ess.iter_mut() {
            if id == first {
                a = Some(ess);
            } else if id == second {
                b = Some(ess);
            }
        }
        match (a, b) {
            (Some(a), Some(b)) => Ok([a as &mut dyn ManagedEss, b]),
            (None, _) => Err(not_found(first)),
            (_, None) => Err(not_found(second)),
        }
    }

    fn meter(&self, id: &str) -> Result<&dyn Meter> {
        let meter = self.meters.get(id).ok_or_else(|| not_found(id))?;
        check_enabled(id, meter.is_enabled())?;
        Ok(meter)
    }
}
