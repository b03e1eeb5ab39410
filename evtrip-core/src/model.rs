//! Trip telemetry data model
//!
//! A [`TripRecord`] is the ordered list of [`Sample`]s recorded for one
//! (vehicle, trip) pair. Samples are sorted by timestamp before they reach
//! the playback engine; the engine never reorders or mutates them.

use crate::units::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle identifier as used by the telemetry dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub u32);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trip identifier, unique per vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub u32);

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A (vehicle, trip) pair chosen for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub vehicle_id: VehicleId,
    pub trip_id: TripId,
}

impl Selection {
    pub fn new(vehicle_id: u32, trip_id: u32) -> Self {
        Self {
            vehicle_id: VehicleId(vehicle_id),
            trip_id: TripId(trip_id),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle {} trip {}", self.vehicle_id, self.trip_id)
    }
}

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another position (haversine, spherical earth)
    pub fn distance_to(&self, other: &Position) -> Meters {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        Meters(EARTH_RADIUS_M * c)
    }
}

/// One telemetry row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Capture time, strictly increasing within a trip
    pub timestamp: DateTime<Utc>,

    pub position: Position,

    pub speed: KilometersPerHour,

    /// High-voltage battery state of charge; `None` where the logger had no reading
    pub state_of_charge: Option<Percent>,

    /// High-voltage battery voltage
    pub voltage: Volts,

    /// Instantaneous power draw (negative while regenerating)
    pub power: Watts,

    pub accumulated_energy: KilowattHours,

    /// Distance from the start of the trip
    pub cumulative_distance: Meters,
}

/// Ordered samples for one (vehicle, trip)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    pub selection: Selection,
    samples: Vec<Sample>,
}

impl TripRecord {
    /// Build a record from samples already sorted by timestamp
    pub fn new(selection: Selection, samples: Vec<Sample>) -> Self {
        Self { selection, samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Number of samples; one sample is replayed per tick
    pub fn duration(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Cumulative distance of the last sample
    pub fn total_distance(&self) -> Meters {
        self.samples
            .last()
            .map(|s| s.cumulative_distance)
            .unwrap_or_default()
    }

    /// State of charge used between the first and last reading
    pub fn soc_consumed(&self) -> Percent {
        match (self.first_soc(), self.last_soc()) {
            (Some(first), Some(last)) => Percent(first.0 - last.0),
            _ => Percent(0.0),
        }
    }

    /// Earliest recorded state of charge
    pub fn first_soc(&self) -> Option<Percent> {
        self.samples.iter().find_map(|s| s.state_of_charge)
    }

    /// Latest recorded state of charge
    pub fn last_soc(&self) -> Option<Percent> {
        self.samples.iter().rev().find_map(|s| s.state_of_charge)
    }

    /// Positions of the samples in `range`, in recorded order
    pub fn positions(&self, range: std::ops::Range<usize>) -> Vec<Position> {
        self.samples[range].iter().map(|s| s.position).collect()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{trip, trip_with_gaps};
    use super::*;

    #[test]
    fn test_trip_derived_totals() {
        let record = trip(&[0.0, 500.0, 1200.0], &[80.0, 79.5, 78.0]);
        assert_eq!(record.duration(), 3);
        assert_eq!(record.total_distance(), Meters(1200.0));
        assert!((record.soc_consumed().0 - 2.0).abs() < 1e-9);
        assert_eq!(record.first_soc(), Some(Percent(80.0)));
        assert_eq!(record.last_soc(), Some(Percent(78.0)));
    }

    #[test]
    fn test_soc_totals_skip_missing_readings() {
        let record = trip_with_gaps(
            &[0.0, 100.0, 200.0, 300.0],
            &[None, Some(70.0), Some(69.0), None],
        );
        assert_eq!(record.first_soc(), Some(Percent(70.0)));
        assert_eq!(record.last_soc(), Some(Percent(69.0)));
        assert_eq!(record.soc_consumed(), Percent(1.0));

        let no_readings = trip_with_gaps(&[0.0, 100.0], &[None, None]);
        assert_eq!(no_readings.first_soc(), None);
        assert_eq!(no_readings.soc_consumed(), Percent(0.0));
    }

    #[test]
    fn test_empty_trip_totals_are_zero() {
        let record = TripRecord::new(Selection::new(1, 2), Vec::new());
        assert!(record.is_empty());
        assert_eq!(record.total_distance(), Meters(0.0));
        assert_eq!(record.soc_consumed(), Percent(0.0));
        assert!(record.sample(0).is_none());
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(1.0, 0.0);
        let d = a.distance_to(&b).0;
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_selection_serializes_flat_ids() {
        let json = serde_json::to_value(Selection::new(10, 1558)).unwrap();
        assert_eq!(json["vehicle_id"], 10);
        assert_eq!(json["trip_id"], 1558);
    }
}
