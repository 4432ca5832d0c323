//! Fixed-interval polling loop.
//!
//! Each tick runs one Fetch → Detect → Format → Send cycle. A cycle that
//! outlasts the interval delays the next tick instead of overlapping it.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use relay_core::SyncState;

use crate::relay::Relay;

/// Which CLI mode a polling run belongs to; decides the first watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Schedule,
}

/// Starting watermark for a polling run.
///
/// With `new_only`, a single run forwards what was created today and the loop
/// forwards what is created after it starts. Otherwise the first cycle sends
/// every record.
pub fn initial_state(mode: RunMode, new_only: bool, now: DateTime<Utc>) -> SyncState {
    match (new_only, mode) {
        (false, _) => SyncState::unbounded(),
        (true, RunMode::Once) => SyncState::start_of_day(now),
        (true, RunMode::Schedule) => SyncState::starting_at(now),
    }
}

/// Poll every `interval` until `shutdown` resolves. Returns the final state.
pub async fn run_scheduler<F>(
    relay: &Relay,
    mut state: SyncState,
    interval: Duration,
    new_only: bool,
    shutdown: F,
) -> SyncState
where
    F: Future<Output = ()>,
{
    info!(
        "scheduler started (interval: {}s, new_items_only: {})",
        interval.as_secs(),
        new_only
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(cycles = cycle, "scheduler stopping");
                return state;
            }
            _ = ticker.tick() => {
                cycle += 1;
                match relay.poll_once(&mut state, new_only).await {
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => {
                        error!(cycle, error = %e, "poll cannot succeed with this configuration; stopping");
                        return state;
                    }
                    Err(e) => {
                        warn!(cycle, kind = e.kind(), error = %e, "poll failed; retrying next interval");
                    }
                }
            }
        }
    }
}
