//! Telemetry sources for EV trip replay

pub mod demo;
pub mod ved;

pub use demo::demo_store;
pub use ved::{load_csv, read_csv};
