//! Telemetry store trait and in-memory implementation

use crate::model::{Sample, Selection, TripId, TripRecord, VehicleId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only source of trip records
///
/// Implementations are responsible for cleaning and ordering the data:
/// every record handed out must be sorted by timestamp. A lookup that
/// cannot be satisfied (unknown ids, no rows) returns `None`; the engine
/// treats that the same as an empty trip.
pub trait TelemetryStore: Send + Sync {
    /// Samples for one (vehicle, trip)
    fn trip(&self, selection: &Selection) -> Option<Arc<TripRecord>>;

    /// All vehicle ids, ascending
    fn vehicles(&self) -> Vec<VehicleId>;

    /// Trip ids recorded for `vehicle`, ascending
    fn trips(&self, vehicle: VehicleId) -> Vec<TripId>;
}

/// Store holding every trip in memory, keyed by (vehicle, trip)
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    trips: BTreeMap<(VehicleId, TripId), Arc<TripRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group rows by (vehicle, trip) and sort each trip by timestamp.
    ///
    /// The sort is stable, so rows sharing a timestamp keep their input order.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (Selection, Sample)>,
    {
        let mut grouped: BTreeMap<(VehicleId, TripId), Vec<Sample>> = BTreeMap::new();
        for (selection, sample) in rows {
            grouped
                .entry((selection.vehicle_id, selection.trip_id))
                .or_default()
                .push(sample);
        }

        let mut store = Self::new();
        for ((vehicle_id, trip_id), mut samples) in grouped {
            samples.sort_by_key(|s| s.timestamp);
            store.insert(TripRecord::new(
                Selection {
                    vehicle_id,
                    trip_id,
                },
                samples,
            ));
        }
        store
    }

    /// Add or replace a trip
    pub fn insert(&mut self, record: TripRecord) {
        let key = (record.selection.vehicle_id, record.selection.trip_id);
        self.trips.insert(key, Arc::new(record));
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

impl TelemetryStore for InMemoryStore {
    fn trip(&self, selection: &Selection) -> Option<Arc<TripRecord>> {
        self.trips
            .get(&(selection.vehicle_id, selection.trip_id))
            .cloned()
    }

    fn vehicles(&self) -> Vec<VehicleId> {
        let mut ids: Vec<VehicleId> = self.trips.keys().map(|(v, _)| *v).collect();
        ids.dedup();
        ids
    }

    fn trips(&self, vehicle: VehicleId) -> Vec<TripId> {
        self.trips
            .range((vehicle, TripId(u32::MIN))..=(vehicle, TripId(u32::MAX)))
            .map(|((_, t), _)| *t)
            .collect()
    }
}
