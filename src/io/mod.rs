/// CSV export of cycle records.
pub mod export;
