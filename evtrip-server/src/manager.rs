//! Tick manager
//!
//! This module handles:
//! - Emitting ticks at the configured fixed period
//! - Advancing every playback slot once per tick
//! - Broadcasting the resulting snapshots to subscribers

use crate::state::AppState;
use evtrip_core::session::Phase;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Main tick loop; returns when `cancel` fires
pub async fn run(state: AppState, cancel: CancellationToken) {
    let period = state.engine.config().tick_period;
    let mut ticker = interval(period);
    // Ticks map 1:1 to samples, so a late tick is delayed rather than bursted
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    info!("Tick manager started ({} ms period)", period.as_millis());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let tick = state.next_tick();
        let updated = tick_sessions(&state, tick).await;
        debug!("Tick {}: {} slots updated", tick, updated);
    }

    info!("Tick manager stopped");
}

/// Advance every slot to `tick`, returning how many produced a new snapshot
pub async fn tick_sessions(state: &AppState, tick: u64) -> usize {
    let mut updated = 0;

    for (slot, session) in state.sessions.iter().enumerate() {
        let mut session = session.write().await;
        if session.tick(&state.engine, tick).is_none() {
            continue;
        }

        if session.phase() == Phase::Halted {
            info!(
                "Slot {} ({}) depleted at tick {}, playback halted",
                slot,
                session
                    .selection()
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                tick
            );
        }

        state.publish(slot, tick, &session);
        updated += 1;
    }

    updated
}
