//! Loader for the vehicle energy dataset CSV export
//!
//! Expected columns (header lookup is case-insensitive, order is free):
//!
//! | column | field |
//! |---|---|
//! | `Timestamp(ms)` | sample time, milliseconds |
//! | `VehId` | vehicle id |
//! | `Trip` | trip id |
//! | `Latitude[deg]`, `Longitude[deg]` | position |
//! | `Vehicle_Speed[km/h]` | speed |
//! | `HV_Battery_SOC[%]` | state of charge |
//! | `HV_Battery_Voltage[V]` | battery voltage |
//! | `Power[W]` | power draw |
//! | `Accum_Energy[kWh]` | accumulated energy |
//! | `Distance[m]` (optional) | cumulative trip distance |
//!
//! Rows with an unreadable timestamp or position are skipped. An empty or
//! non-numeric SOC cell is kept as a missing reading (the dataset leaves it
//! blank for conventional vehicles); other empty measurement cells read as
//! zero. Without a distance column the cumulative distance is rebuilt from
//! consecutive positions.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use evtrip_core::model::{Position, Sample, Selection};
use evtrip_core::units::*;
use evtrip_core::InMemoryStore;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Load a dataset file into an in-memory store
pub fn load_csv(path: &Path) -> Result<InMemoryStore> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open telemetry file {}", path.display()))?;
    let store = read_csv(file).with_context(|| format!("Failed to load {}", path.display()))?;
    info!(
        "Loaded {} trips for {} vehicles from {}",
        store.len(),
        evtrip_core::TelemetryStore::vehicles(&store).len(),
        path.display()
    );
    Ok(store)
}

/// Parse dataset CSV from any reader
pub fn read_csv<R: Read>(reader: R) -> Result<InMemoryStore> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::detect(rdr.headers()?)?;

    let mut rows: Vec<(Selection, Sample)> = Vec::new();
    let mut bad_timestamps = 0usize;
    let mut bad_positions = 0usize;

    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", line + 1))?;

        let Some(timestamp) = record.get(columns.timestamp).and_then(parse_timestamp) else {
            bad_timestamps += 1;
            continue;
        };

        let vehicle = parse_id(record.get(columns.vehicle))
            .with_context(|| format!("Invalid VehId on row {}", line + 1))?;
        let trip = parse_id(record.get(columns.trip))
            .with_context(|| format!("Invalid Trip on row {}", line + 1))?;

        let reading = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(parse_reading);
        let number = |idx: Option<usize>| reading(idx).unwrap_or(0.0);

        let (Some(lat), Some(lon)) = (reading(Some(columns.lat)), reading(Some(columns.lon))) else {
            bad_positions += 1;
            continue;
        };

        let sample = Sample {
            timestamp,
            position: Position::new(lat, lon),
            speed: KilometersPerHour(number(columns.speed)),
            state_of_charge: reading(columns.soc).map(Percent),
            voltage: Volts(number(columns.voltage)),
            power: Watts(number(columns.power)),
            accumulated_energy: KilowattHours(number(columns.energy)),
            cumulative_distance: Meters(number(columns.distance)),
        };
        rows.push((Selection::new(vehicle, trip), sample));
    }

    if bad_timestamps > 0 {
        warn!("Skipped {} rows with an invalid timestamp", bad_timestamps);
    }
    if bad_positions > 0 {
        warn!("Skipped {} rows without a usable position", bad_positions);
    }

    if columns.distance.is_none() {
        derive_distances(&mut rows);
    }

    Ok(InMemoryStore::from_rows(rows))
}

/// Column indices resolved from the header row
struct Columns {
    timestamp: usize,
    vehicle: usize,
    trip: usize,
    lat: usize,
    lon: usize,
    speed: Option<usize>,
    soc: Option<usize>,
    voltage: Option<usize>,
    power: Option<usize>,
    energy: Option<usize>,
    distance: Option<usize>,
}

impl Columns {
    fn detect(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| find(name).ok_or_else(|| anyhow!("Missing required column '{}'", name));

        Ok(Self {
            timestamp: require("Timestamp(ms)")?,
            vehicle: require("VehId")?,
            trip: require("Trip")?,
            lat: require("Latitude[deg]")?,
            lon: require("Longitude[deg]")?,
            speed: find("Vehicle_Speed[km/h]"),
            soc: find("HV_Battery_SOC[%]"),
            voltage: find("HV_Battery_Voltage[V]"),
            power: find("Power[W]"),
            energy: find("Accum_Energy[kWh]"),
            distance: find("Distance[m]"),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let ms = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    DateTime::from_timestamp_millis(ms.round() as i64)
}

/// Ids are integers, though some exports write them as `706.0`
fn parse_id(raw: Option<&str>) -> Result<u32> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if let Ok(id) = raw.parse::<u32>() {
        return Ok(id);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&v) => Ok(v as u32),
        _ => Err(anyhow!("'{}' is not an id", raw)),
    }
}

/// A finite number, or `None` for blank, `NaN` and non-numeric cells
fn parse_reading(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Fill `cumulative_distance` from the haversine distance between
/// consecutive positions of each trip
fn derive_distances(rows: &mut [(Selection, Sample)]) {
    rows.sort_by_key(|(sel, s)| (sel.vehicle_id, sel.trip_id, s.timestamp));

    let mut current: Option<Selection> = None;
    let mut previous: Option<Position> = None;
    let mut total = 0.0;

    for (selection, sample) in rows.iter_mut() {
        if current != Some(*selection) {
            current = Some(*selection);
            previous = None;
            total = 0.0;
        }
        if let Some(prev) = previous {
            total += prev.distance_to(&sample.position).0;
        }
        sample.cumulative_distance = Meters(total);
        previous = Some(sample.position);
    }
}
