use crate::devices::types::Meter;

/// Grid meter whose reading is set by the simulation engine each cycle.
#[derive(Debug, Clone)]
pub struct SimulatedMeter {
    id: String,
    enabled: bool,
    active_power_w: Option<i32>,
}

impl SimulatedMeter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            active_power_w: None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Updates the grid power reading (positive = buy from grid).
    pub fn set_active_power(&mut self, watts: Option<i32>) {
        self.active_power_w = watts;
    }
}

impl Meter for SimulatedMeter {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn active_power(&self) -> Option<i32> {
        self.active_power_w
    }
}
