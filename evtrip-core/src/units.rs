//! Type-safe wrappers for physical units
//!
//! Newtypes around f64 so distances in meters never get mixed up with
//! kilometers, or watts with kilowatts.
//!
//! All unit types serialize with 4 decimal places to reduce JSON payload size.

use serde::{Deserialize, Serialize};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Meters(#[serde(serialize_with = "round4")] pub f64);

impl Meters {
    pub fn to_km(self) -> Kilometers {
        Kilometers(self.0 / 1000.0)
    }
}

/// Kilometers
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Kilometers(#[serde(serialize_with = "round4")] pub f64);

/// Kilometers per hour
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round4")] pub f64);

/// Percentage on a 0-100 scale (battery state of charge)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round4")] pub f64);

/// Volts (electrical)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Volts(#[serde(serialize_with = "round4")] pub f64);

/// Watts
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Watts(#[serde(serialize_with = "round4")] pub f64);

impl Watts {
    pub fn to_kw(self) -> Kilowatts {
        Kilowatts(self.0 / 1000.0)
    }
}

/// Kilowatts
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Kilowatts(#[serde(serialize_with = "round4")] pub f64);

/// Kilowatt-hours (energy)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct KilowattHours(#[serde(serialize_with = "round4")] pub f64);

/// Probability (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Probability(#[serde(serialize_with = "round4")] pub f64);

impl Probability {
    /// Create a new probability, clamping to [0.0, 1.0]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Get as percentage (0-100)
    pub fn as_percent(&self) -> f64 {
        self.0 * 100.0
    }
}
