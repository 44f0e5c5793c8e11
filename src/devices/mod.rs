//! Storage units, meters and site profiles.

/// Per-cycle feasible power range and start-up state of a storage unit.
pub mod envelope;
/// Simulated hybrid storage unit.
pub mod ess;
/// Site consumption profile generator.
pub mod load;
pub mod meter;
/// Photovoltaic production profile generator.
pub mod production;
pub mod types;

// Re-export the main types for convenience
pub use envelope::{PowerEnvelope, PowerLimits, PowerRange, Readiness, ReadinessTiming};
pub use ess::{EssParams, SimulatedEss};
pub use load::LoadProfile;
pub use meter::SimulatedMeter;
pub use production::ProductionProfile;
pub use types::{ManagedEss, Meter};
