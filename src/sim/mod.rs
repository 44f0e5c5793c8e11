/// Fixed-period cycle clock.
pub mod clock;
pub mod controller;
pub mod engine;
/// Grid connection state of storage units.
pub mod grid_mode;
pub mod registry;
pub mod soc_area;
pub mod split_table;
/// Site aggregate readings.
pub mod sum;
pub mod types;
