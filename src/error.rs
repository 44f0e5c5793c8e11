//! Error types shared by the dispatch core.

use thiserror::Error;

/// Conditions that abort a single dispatch cycle.
///
/// None of these carry state into the next cycle: envelopes and SoC areas are
/// recomputed from fresh readings every time.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("component `{id}` not found")]
    ComponentNotFound { id: String },

    #[error("component `{id}` is disabled")]
    ComponentDisabled { id: String },

    #[error("{channel} of `{component}` is undefined")]
    UndefinedValue {
        component: String,
        channel: &'static str,
    },

    #[error("`{id}` cannot be both main and support unit")]
    SharedComponent { id: String },

    #[error("split fraction {0} is outside [0, 1]")]
    InvalidSplitFraction(f64),

    #[error("`{id}` rejected set-point: {reason}")]
    SetPointRejected { id: String, reason: String },

    #[error("set-point for `{applied}` was withdrawn after `{failed}` rejected its own: {reason}")]
    PartialEmission {
        applied: String,
        failed: String,
        reason: String,
    },
}

impl DispatchError {
    pub fn undefined(component: impl Into<String>, channel: &'static str) -> Self {
        Self::UndefinedValue {
            component: component.into(),
            channel,
        }
    }
}

/// Why a single forecast row was rejected.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("missing `{0}` column")]
    MissingField(&'static str),

    #[error("invalid {field} timestamp `{raw}`")]
    Timestamp { field: &'static str, raw: String },

    #[error("invalid value `{raw}`: {source}")]
    Value {
        raw: String,
        source: std::num::ParseIntError,
    },

    #[error("interval end {end} is not after start {start}")]
    InvertedInterval { start: String, end: String },

    #[error("negative value {0}")]
    NegativeValue(i32),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;
