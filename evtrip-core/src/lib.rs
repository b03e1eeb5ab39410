//! EV Trip Replay Core Library
//!
//! This crate provides the trip telemetry model, the degradation-risk curve
//! and the tick-driven playback engine. Storage and presentation live in the
//! adapter and server crates.

pub mod curve;
pub mod engine;
pub mod model;
pub mod session;
pub mod store;
pub mod units;

pub use curve::{CurveError, DegradationCurve};
pub use engine::{Advance, EngineConfig, PlaybackEngine, SimulationState, Snapshot};
pub use model::{Sample, Selection, TripRecord};
pub use session::{Phase, PlaybackSession};
pub use store::{InMemoryStore, TelemetryStore};
