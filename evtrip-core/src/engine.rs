//! Tick-driven playback engine
//!
//! The engine replays one trip record per selection, one sample per tick.
//! It keeps no per-session data of its own: every call takes the session's
//! [`SimulationState`] by reference and hands back a new one, so any number
//! of sessions can share one engine.
//!
//! Two playback variants are supported:
//! - looping: the trip is replayed from the start each time it ends, and
//!   the sample index is `elapsed mod duration`;
//! - round-trip: the trip is driven forward, then backward (samples in
//!   reverse order), and the distance and state-of-charge of each finished
//!   leg are carried into running offsets.

use crate::curve::DegradationCurve;
use crate::model::{Position, Sample, Selection, TripRecord};
use crate::store::TelemetryStore;
use crate::units::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Direction of travel through the sample sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Per-session accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Completed cycles (one loop, or one forward+backward pair)
    pub cycle_count: u64,

    /// Distance of all finished legs
    pub distance_offset: Kilometers,

    /// State of charge consumed by all finished legs
    pub soc_offset: Percent,

    /// Tick at which the current leg started
    pub leg_start_tick: u64,

    pub direction: Direction,

    /// Set once the battery is depleted; cleared only by a reset
    pub halted: bool,
}

impl SimulationState {
    /// Fresh state for a leg starting at `tick`
    pub fn start(tick: u64) -> Self {
        Self {
            cycle_count: 0,
            distance_offset: Kilometers(0.0),
            soc_offset: Percent(0.0),
            leg_start_tick: tick,
            direction: Direction::Forward,
            halted: false,
        }
    }
}

/// Engine configuration shared by every session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the tick source; one sample is replayed per tick
    #[serde(rename = "tick_period_ms", with = "duration_ms")]
    pub tick_period: Duration,

    /// Drive each trip forward then backward instead of looping it
    pub round_trip: bool,

    pub curve: DegradationCurve,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(1000),
            round_trip: false,
            curve: DegradationCurve::default(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        if ms == 0 {
            return Err(serde::de::Error::custom("tick period must be at least 1 ms"));
        }
        Ok(Duration::from_millis(ms))
    }
}

/// Values displayed for the current sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub speed: KilometersPerHour,
    /// `None` for samples without a battery reading
    pub soc: Option<Percent>,
    pub voltage: Volts,
    pub power: Kilowatts,
    pub accumulated_energy: KilowattHours,
    pub cycle_count: u64,
    pub total_distance_km: Kilometers,
    pub risk_probability: Probability,
}

/// Display strings for each metric card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricLabels {
    pub speed: String,
    pub soc: String,
    pub voltage: String,
    pub power: String,
    pub accumulated_energy: String,
    pub cycle_count: String,
    pub total_distance: String,
    pub risk: String,
}

impl MetricLabels {
    /// Placeholders shown while nothing is playing
    pub fn placeholder() -> Self {
        Self {
            speed: "-- km/h".to_string(),
            soc: "-- %".to_string(),
            voltage: "-- V".to_string(),
            power: "-- kW".to_string(),
            accumulated_energy: "-- kWh".to_string(),
            cycle_count: "--".to_string(),
            total_distance: "-- km".to_string(),
            risk: "-- %".to_string(),
        }
    }
}

impl Metrics {
    pub fn labels(&self) -> MetricLabels {
        MetricLabels {
            speed: format!("{:.1} km/h", self.speed.0),
            soc: match self.soc {
                Some(soc) => format!("{:.1} %", soc.0),
                None => "-- %".to_string(),
            },
            voltage: format!("{:.1} V", self.voltage.0),
            power: format!("{:.2} kW", self.power.0),
            accumulated_energy: format!("{:.3} kWh", self.accumulated_energy.0),
            cycle_count: self.cycle_count.to_string(),
            total_distance: format!("{:.2} km", self.total_distance_km.0),
            risk: format!("{:.1} %", self.risk_probability.as_percent()),
        }
    }
}

/// Everything the host needs to render one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Positions already covered in the current direction of travel
    pub path: Vec<Position>,

    /// Current vehicle position
    pub marker: Option<Position>,

    pub metrics: Option<Metrics>,

    pub labels: MetricLabels,

    /// False once the session is halted; the host stops ticking it
    pub timer_enabled: bool,
}

impl Snapshot {
    /// Placeholder snapshot for a session with nothing to play
    pub fn idle() -> Self {
        Self {
            path: Vec::new(),
            marker: None,
            metrics: None,
            labels: MetricLabels::placeholder(),
            timer_enabled: false,
        }
    }

    fn new(path: Vec<Position>, sample: &Sample, metrics: Metrics, timer_enabled: bool) -> Self {
        Self {
            path,
            marker: Some(sample.position),
            labels: metrics.labels(),
            metrics: Some(metrics),
            timer_enabled,
        }
    }
}

/// Result of one [`PlaybackEngine::advance`] call
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Nothing to do: halted, no selection, or no samples
    Unchanged,

    Updated {
        state: SimulationState,
        snapshot: Snapshot,
    },
}

/// The playback state machine
pub struct PlaybackEngine {
    config: EngineConfig,
    store: Arc<dyn TelemetryStore>,
}

impl PlaybackEngine {
    pub fn new(config: EngineConfig, store: Arc<dyn TelemetryStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TelemetryStore> {
        &self.store
    }

    fn lookup(&self, selection: &Selection) -> Option<Arc<TripRecord>> {
        self.store.trip(selection).filter(|trip| !trip.is_empty())
    }

    /// Start playback of `selection` at `tick`.
    ///
    /// Returns `None` when the selection has no samples; the session stays
    /// idle and shows placeholders.
    pub fn reset(&self, tick: u64, selection: &Selection) -> Option<(SimulationState, Snapshot)> {
        let trip = self.lookup(selection)?;
        let state = SimulationState::start(tick);
        let sample = trip.sample(0)?;

        let total_distance_km = sample.cumulative_distance.to_km();
        let metrics = Metrics {
            speed: sample.speed,
            soc: sample.state_of_charge.map(|soc| Percent(soc.0.max(0.0))),
            voltage: sample.voltage,
            power: sample.power.to_kw(),
            accumulated_energy: sample.accumulated_energy,
            cycle_count: 0,
            total_distance_km,
            risk_probability: self.config.curve.interpolate(total_distance_km),
        };

        Some((state, Snapshot::new(Vec::new(), sample, metrics, true)))
    }

    /// Replay the sample for `tick`.
    pub fn advance(
        &self,
        tick: u64,
        selection: Option<&Selection>,
        state: &SimulationState,
    ) -> Advance {
        if state.halted {
            return Advance::Unchanged;
        }
        let Some(trip) = selection.and_then(|s| self.lookup(s)) else {
            return Advance::Unchanged;
        };

        let duration = trip.duration() as u64;
        let mut next = state.clone();
        let mut elapsed = tick.saturating_sub(state.leg_start_tick);

        let index: u64 = if self.config.round_trip {
            if elapsed >= duration {
                complete_leg(&mut next, &trip, tick);
                elapsed = 0;
            }
            match next.direction {
                Direction::Forward => elapsed.min(duration - 1),
                Direction::Backward => (duration - 1).saturating_sub(elapsed),
            }
        } else {
            next.cycle_count = elapsed / duration;
            elapsed % duration
        };
        let index = index as usize;

        let Some(sample) = trip.sample(index) else {
            return Advance::Unchanged;
        };

        // Samples without a reading show no SOC and cannot deplete the battery
        let soc = sample.state_of_charge.map(|reading| {
            let value = match next.direction {
                Direction::Forward => reading.0 - next.soc_offset.0,
                Direction::Backward => {
                    let first = trip.first_soc().unwrap_or(reading).0;
                    let last = trip.last_soc().unwrap_or(reading).0;
                    (first - next.soc_offset.0) - (reading.0 - last)
                }
            };
            Percent(value.max(0.0))
        });
        if soc.is_some_and(|soc| soc.0 <= 0.0) {
            next.halted = true;
        }

        let leg_distance = match next.direction {
            Direction::Forward => sample.cumulative_distance,
            Direction::Backward => Meters(trip.total_distance().0 - sample.cumulative_distance.0),
        };
        let total_distance_km = Kilometers(next.distance_offset.0 + leg_distance.to_km().0);

        let metrics = Metrics {
            speed: sample.speed,
            soc,
            voltage: sample.voltage,
            power: sample.power.to_kw(),
            accumulated_energy: sample.accumulated_energy,
            cycle_count: next.cycle_count,
            total_distance_km,
            risk_probability: self.config.curve.interpolate(total_distance_km),
        };

        let path = match next.direction {
            Direction::Forward => trip.positions(0..index + 1),
            Direction::Backward => trip.positions(index..trip.duration()),
        };

        let timer_enabled = !next.halted;
        Advance::Updated {
            snapshot: Snapshot::new(path, sample, metrics, timer_enabled),
            state: next,
        }
    }
}

/// Carry the finished leg into the offsets and turn around
fn complete_leg(state: &mut SimulationState, trip: &TripRecord, tick: u64) {
    state.distance_offset.0 += trip.total_distance().to_km().0.max(0.0);
    // A trip that gained charge must not pull the running offset back down
    state.soc_offset.0 += trip.soc_consumed().0.max(0.0);

    state.direction = match state.direction {
        Direction::Forward => Direction::Backward,
        Direction::Backward => {
            state.cycle_count += 1;
            Direction::Forward
        }
    };
    state.leg_start_tick = tick;
}
