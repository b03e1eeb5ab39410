//! Application state management

use evtrip_core::engine::{PlaybackEngine, Snapshot};
use evtrip_core::model::Selection;
use evtrip_core::session::{Phase, PlaybackSession};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Snapshot published for one slot
#[derive(Clone, Debug, Serialize)]
pub struct SessionEvent {
    pub slot: usize,
    pub tick: u64,
    pub phase: Phase,
    pub selection: Option<Selection>,
    pub snapshot: Snapshot,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Engine shared by every slot
    pub engine: Arc<PlaybackEngine>,

    /// One independent playback session per dashboard slot
    ///
    /// Each session has its own lock: the tick manager and selection
    /// changes are the only writers.
    pub sessions: Arc<Vec<Arc<RwLock<PlaybackSession>>>>,

    /// Global tick counter, advanced by the tick manager
    pub tick: Arc<AtomicU64>,

    /// Broadcast channel for session snapshots
    /// Multiple consumers can subscribe to receive events
    pub events_tx: broadcast::Sender<SessionEvent>,
}

impl AppState {
    pub fn new(engine: PlaybackEngine, slots: usize) -> Self {
        // Create broadcast channel with capacity for 100 events
        let (events_tx, _) = broadcast::channel(100);

        let sessions = (0..slots)
            .map(|_| Arc::new(RwLock::new(PlaybackSession::new())))
            .collect();

        Self {
            engine: Arc::new(engine),
            sessions: Arc::new(sessions),
            tick: Arc::new(AtomicU64::new(0)),
            events_tx,
        }
    }

    pub fn session(&self, slot: usize) -> Option<&Arc<RwLock<PlaybackSession>>> {
        self.sessions.get(slot)
    }

    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    /// Advance the global tick counter, returning the new tick
    pub fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Publish the current snapshot of `session`
    pub fn publish(&self, slot: usize, tick: u64, session: &PlaybackSession) {
        // Ignore error if no receivers (they'll get the next event)
        let _ = self.events_tx.send(SessionEvent {
            slot,
            tick,
            phase: session.phase(),
            selection: session.selection().copied(),
            snapshot: session.snapshot().clone(),
        });
    }
}
