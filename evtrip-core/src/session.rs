//! Session-scoped playback value
//!
//! A [`PlaybackSession`] pairs a selection with its simulation state and the
//! last rendered snapshot. Hosts keep one per dashboard slot and call
//! [`select`](PlaybackSession::select) on selection changes and
//! [`tick`](PlaybackSession::tick) on every timer tick.

use crate::engine::{Advance, PlaybackEngine, SimulationState, Snapshot};
use crate::model::Selection;
use serde::{Deserialize, Serialize};

/// Coarse playback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No selection, or the selection has no samples
    Idle,
    Playing,
    /// Battery depleted; waits for a new selection
    Halted,
}

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    selection: Option<Selection>,
    state: Option<SimulationState>,
    snapshot: Snapshot,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            selection: None,
            state: None,
            snapshot: Snapshot::idle(),
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn phase(&self) -> Phase {
        match &self.state {
            None => Phase::Idle,
            Some(state) if state.halted => Phase::Halted,
            Some(_) => Phase::Playing,
        }
    }

    /// Switch to `selection`, discarding all accumulated state
    pub fn select(&mut self, engine: &PlaybackEngine, tick: u64, selection: Selection) -> &Snapshot {
        self.selection = Some(selection);
        match engine.reset(tick, &selection) {
            Some((state, snapshot)) => {
                self.state = Some(state);
                self.snapshot = snapshot;
            }
            None => {
                self.state = None;
                self.snapshot = Snapshot::idle();
            }
        }
        &self.snapshot
    }

    /// Drop the selection and return to idle
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Advance to `tick`; returns the new snapshot when anything changed
    pub fn tick(&mut self, engine: &PlaybackEngine, tick: u64) -> Option<&Snapshot> {
        let state = self.state.as_ref()?;
        match engine.advance(tick, self.selection.as_ref(), state) {
            Advance::Updated { state, snapshot } => {
                self.state = Some(state);
                self.snapshot = snapshot;
                Some(&self.snapshot)
            }
            Advance::Unchanged => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::model::test_support::trip;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    fn engine(round_trip: bool, socs: &[f64]) -> PlaybackEngine {
        let mut store = InMemoryStore::new();
        store.insert(trip(&[0.0, 100.0, 200.0], socs));
        PlaybackEngine::new(
            EngineConfig {
                round_trip,
                ..EngineConfig::default()
            },
            Arc::new(store),
        )
    }

    #[test]
    fn test_new_session_is_idle() {
        let mut session = PlaybackSession::new();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.tick(&engine(false, &[50.0, 49.0, 48.0]), 1).is_none());
        assert_eq!(session.snapshot(), &Snapshot::idle());
    }

    #[test]
    fn test_select_then_tick_plays() {
        let engine = engine(false, &[50.0, 49.0, 48.0]);
        let mut session = PlaybackSession::new();
        session.select(&engine, 10, Selection::new(1, 1));
        assert_eq!(session.phase(), Phase::Playing);

        let snapshot = session.tick(&engine, 12).unwrap();
        assert_eq!(snapshot.path.len(), 3);
        assert_eq!(session.state().unwrap().leg_start_tick, 10);
    }

    #[test]
    fn test_select_unknown_trip_stays_idle() {
        let engine = engine(false, &[50.0, 49.0, 48.0]);
        let mut session = PlaybackSession::new();
        session.select(&engine, 0, Selection::new(1, 1));
        session.tick(&engine, 1);

        let snapshot = session.select(&engine, 2, Selection::new(4, 4)).clone();
        assert_eq!(snapshot, Snapshot::idle());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.selection(), Some(&Selection::new(4, 4)));
        assert!(session.tick(&engine, 3).is_none());
    }

    #[test]
    fn test_halted_session_resumes_only_on_select() {
        let engine = engine(true, &[1.0, 0.5, 0.0]);
        let mut session = PlaybackSession::new();
        session.select(&engine, 0, Selection::new(1, 1));

        session.tick(&engine, 1);
        assert_eq!(session.phase(), Phase::Playing);
        session.tick(&engine, 2);
        assert_eq!(session.phase(), Phase::Halted);
        let frozen = session.snapshot().clone();
        assert!(!frozen.timer_enabled);

        assert!(session.tick(&engine, 3).is_none());
        assert_eq!(session.snapshot(), &frozen);

        session.select(&engine, 4, Selection::new(1, 1));
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.state(), Some(&SimulationState::start(4)));
    }

    #[test]
    fn test_clear_returns_to_idle() {
        let engine = engine(false, &[50.0, 49.0, 48.0]);
        let mut session = PlaybackSession::new();
        session.select(&engine, 0, Selection::new(1, 1));
        session.clear();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.selection().is_none());
    }
}
