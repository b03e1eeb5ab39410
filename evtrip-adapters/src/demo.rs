//! Synthetic demo trips for running without a dataset
//!
//! Each trip drives laps of a small street circuit made of straights,
//! braking zones, corners and acceleration phases. Speed follows a smooth
//! profile between segment targets, position is integrated from speed and
//! heading, and the battery discharges with the power drawn. Output is fully
//! deterministic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use evtrip_core::model::{Position, Sample, Selection, TripRecord};
use evtrip_core::units::*;
use evtrip_core::InMemoryStore;

// =============================================================================
// Circuit definition
// =============================================================================

#[derive(Clone, Copy)]
enum SegmentKind {
    Straight, // Cruise at target speed
    Braking,  // Slowing into a corner
    Corner,   // Turning at roughly constant speed
    Accel,    // Pulling away from a corner
}

#[derive(Clone, Copy)]
struct Segment {
    kind: SegmentKind,
    duration: u32,     // seconds (one sample per second)
    target_speed: f64, // km/h at end of segment
    turn_deg: f64,     // heading change over the segment (+ = right)
}

/// Four right-hand corners, ~3.5 km per lap
fn demo_circuit() -> Vec<Segment> {
    use SegmentKind::*;
    let mut circuit = Vec::new();
    for straight in [60, 45, 60, 45] {
        circuit.extend([
            Segment { kind: Accel,    duration: 12,       target_speed: 55.0, turn_deg: 0.0 },
            Segment { kind: Straight, duration: straight, target_speed: 60.0, turn_deg: 0.0 },
            Segment { kind: Braking,  duration: 6,        target_speed: 25.0, turn_deg: 0.0 },
            Segment { kind: Corner,   duration: 8,        target_speed: 22.0, turn_deg: 90.0 },
        ]);
    }
    circuit
}

/// Circuit start, Ann Arbor
const ORIGIN: Position = Position {
    lat: 42.2808,
    lon: -83.7430,
};

// =============================================================================
// Vehicle model
// =============================================================================

const MASS_KG: f64 = 1_650.0;
const BATTERY_KWH: f64 = 24.0;
const ROLLING_COEFF: f64 = 0.012;
const DRAG_AREA: f64 = 0.65; // Cd * frontal area, m²
const AIR_DENSITY: f64 = 1.2;
const DRIVETRAIN_EFFICIENCY: f64 = 0.88;
const AUX_LOAD_W: f64 = 1_500.0;
const NOMINAL_VOLTAGE: f64 = 355.0;

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Electrical power drawn at speed `v` (m/s) with acceleration `a` (m/s²).
/// Braking energy is not recovered, so the draw never drops below the
/// auxiliary load.
fn power_draw(v: f64, a: f64) -> f64 {
    let force = MASS_KG * a + ROLLING_COEFF * MASS_KG * 9.81 + 0.5 * AIR_DENSITY * DRAG_AREA * v * v;
    (force * v).max(0.0) / DRIVETRAIN_EFFICIENCY + AUX_LOAD_W
}

fn battery_voltage(soc: f64, power_w: f64) -> f64 {
    NOMINAL_VOLTAGE + 0.5 * (soc - 50.0) - 0.08 * power_w / 1000.0
}

/// Parameters for one generated trip
#[derive(Debug, Clone, Copy)]
pub struct DemoTrip {
    pub selection: Selection,
    pub laps: u32,
    pub start_soc: f64,
    /// Multiplier on circuit target speeds
    pub pace: f64,
    pub start: DateTime<Utc>,
}

impl DemoTrip {
    pub fn generate(&self) -> TripRecord {
        let circuit = demo_circuit();
        let mut samples = Vec::new();

        let mut position = ORIGIN;
        let mut heading = 0.0_f64; // radians clockwise from north
        let mut distance = 0.0_f64;
        let mut energy_kwh = 0.0_f64;
        let mut speed_kph = 0.0_f64;
        let mut elapsed = 0i64;

        for _ in 0..self.laps {
            for segment in &circuit {
                let from = speed_kph;
                let to = segment.target_speed * self.pace;
                let turn_per_step = segment.turn_deg.to_radians() / segment.duration as f64;

                for step in 1..=segment.duration {
                    let t = step as f64 / segment.duration as f64;
                    let next_kph = match segment.kind {
                        SegmentKind::Straight | SegmentKind::Braking | SegmentKind::Accel => {
                            lerp(from, to, smoothstep(t))
                        }
                        // Slight dip mid-corner
                        SegmentKind::Corner => lerp(from, to, t) - 2.0 * (std::f64::consts::PI * t).sin(),
                    }
                    .max(0.0);

                    let v = next_kph / 3.6;
                    let a = (next_kph - speed_kph) / 3.6;
                    let power_w = power_draw(v, a);
                    energy_kwh += power_w / 3_600_000.0;
                    let soc = (self.start_soc - energy_kwh / BATTERY_KWH * 100.0).max(0.0);

                    heading += turn_per_step;
                    let step_m = (speed_kph + next_kph) / 2.0 / 3.6;
                    distance += step_m;
                    position = offset(position, heading, step_m);
                    speed_kph = next_kph;

                    samples.push(Sample {
                        timestamp: self.start + Duration::seconds(elapsed),
                        position,
                        speed: KilometersPerHour(speed_kph),
                        state_of_charge: Some(Percent(soc)),
                        voltage: Volts(battery_voltage(soc, power_w)),
                        power: Watts(power_w),
                        accumulated_energy: KilowattHours(energy_kwh),
                        cumulative_distance: Meters(distance),
                    });
                    elapsed += 1;
                }
            }
        }

        TripRecord::new(self.selection, samples)
    }
}

/// Move `meters` along `heading` using a local flat-earth approximation
fn offset(from: Position, heading: f64, meters: f64) -> Position {
    const METERS_PER_DEG_LAT: f64 = 111_195.0;
    let dlat = meters * heading.cos() / METERS_PER_DEG_LAT;
    let dlon = meters * heading.sin() / (METERS_PER_DEG_LAT * from.lat.to_radians().cos());
    Position::new(from.lat + dlat, from.lon + dlon)
}

/// Trip plan used by [`demo_store`]: three vehicles, three trips each.
/// Vehicle 12 trip 3 starts nearly flat so depletion can be seen quickly.
pub fn demo_trips() -> Vec<DemoTrip> {
    let base = Utc
        .timestamp_opt(1_509_494_400, 0) // 2017-11-01T00:00:00Z
        .single()
        .unwrap_or_default();

    let mut trips = Vec::new();
    for (v, vehicle) in [10u32, 11, 12].into_iter().enumerate() {
        for (t, trip) in [1u32, 2, 3].into_iter().enumerate() {
            let start_soc = if vehicle == 12 && trip == 3 {
                4.0
            } else {
                92.0 - 9.0 * t as f64 - 4.0 * v as f64
            };
            trips.push(DemoTrip {
                selection: Selection::new(vehicle, trip),
                laps: 1 + (t as u32 + v as u32) % 3,
                start_soc,
                pace: 0.9 + 0.1 * v as f64,
                start: base + Duration::hours(24 * v as i64 + 3 * t as i64),
            });
        }
    }
    trips
}

/// In-memory store filled with the demo trips
pub fn demo_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    for trip in demo_trips() {
        store.insert(trip.generate());
    }
    store
}
