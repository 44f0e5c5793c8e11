/// Site-wide aggregate power readings.
///
/// Every reading may be undefined; callers decide per value what that means.
pub trait Aggregates {
    /// Total site consumption in W.
    fn consumption_active_power(&self) -> Option<i32>;

    /// Total production in W (positive while producing).
    fn production_active_power(&self) -> Option<i32>;

    /// Combined active power of all storage units in W.
    fn ess_active_power(&self) -> Option<i32>;

    /// Combined capacity of all storage units in Wh.
    fn ess_capacity(&self) -> Option<i32>;
}

/// Plain snapshot of aggregate readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum {
    pub consumption_active_power: Option<i32>,
    pub production_active_power: Option<i32>,
    pub ess_active_power: Option<i32>,
    pub ess_capacity: Option<i32>,
}

impl Sum {
    /// Adds up optional readings; the total is undefined if any part is.
    pub fn total(values: impl IntoIterator<Item = Option<i32>>) -> Option<i32> {
        values
            .into_iter()
            .try_fold(0i32, |acc, value| value.map(|v| acc.saturating_add(v)))
    }
}

impl Aggregates for Sum {
    fn consumption_active_power(&self) -> Option<i32> {
        self.consumption_active_power
    }

    fn production_active_power(&self) -> Option<i32> {
        self.production_active_power
    }

    fn ess_active_power(&self) -> Option<i32> {
        self.ess_active_power
    }

    fn ess_capacity(&self) -> Option<i32> {
        self.ess_capacity
    }
}
