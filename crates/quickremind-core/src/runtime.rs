//! Periodic maintenance on a tokio runtime.
//!
//! The engine itself is synchronous; hosts share it behind a
//! `tokio::sync::Mutex` and let this loop call [`SchedulerState::tick`]
//! so expired reminders are swept and recurring tasks materialize even
//! when nobody touches the state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::SchedulerState;

pub type SharedState = Arc<Mutex<SchedulerState>>;

/// Tick `state` every `every` until the task is dropped or aborted.
///
/// The first tick runs immediately.
pub async fn maintenance_loop(state: SharedState, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let summary = state.lock().await.tick();
        if summary.expired > 0 || summary.generated > 0 {
            tracing::debug!(
                expired = summary.expired,
                generated = summary.generated,
                "maintenance tick"
            );
        }
    }
}

/// Spawn [`maintenance_loop`] using the configured sweep interval.
pub async fn spawn_maintenance(state: SharedState) -> JoinHandle<()> {
    let every = state.lock().await.config().timing.sweep_interval();
    tracing::info!(every_secs = every.as_secs(), "maintenance loop started");
    tokio::spawn(maintenance_loop(state, every))
}
