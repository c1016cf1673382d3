//! Per-observer countdown clock.
//!
//! Each observer owns its own timer task; one observer's lifecycle never
//! affects another's. The minor redundant computation is the price of
//! that isolation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

use brewlink_core::config::SessionConfig;

use crate::resolver::resolve_current;
use crate::shared::SharedSessionState;
use crate::store::SessionStore;

/// One countdown observation delivered to an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// No session, or the session is expired; the countdown is not
    /// visible.
    Expired,
    /// Live countdown value.
    Running {
        /// Whole minutes remaining.
        minutes: i64,
        /// Leftover seconds within the current minute.
        seconds: i64,
        /// Whether the urgent presentation threshold has been crossed.
        urgent: bool,
    },
}

/// Spawns per-observer countdown tasks over the shared session state.
#[derive(Debug, Clone)]
pub struct SessionClock {
    shared: SharedSessionState,
    store: Arc<SessionStore>,
    config: SessionConfig,
}

impl SessionClock {
    /// Create a clock over the given session sources.
    pub fn new(shared: SharedSessionState, store: Arc<SessionStore>, config: SessionConfig) -> Self {
        Self {
            shared,
            store,
            config,
        }
    }

    /// Start an observer.
    ///
    /// The callback fires once per tick (1 s by default) with either the
    /// live countdown or [`CountdownTick::Expired`]. The returned handle
    /// stops only this observer.
    pub fn spawn<F>(&self, callback: F) -> ClockHandle
    where
        F: Fn(CountdownTick) + Send + Sync + 'static,
    {
        let shared = self.shared.clone();
        let store = self.store.clone();
        let tick = std::time::Duration::from_secs(self.config.clock_tick_seconds.max(1));
        let urgent_threshold = self.config.urgent_threshold_minutes;

        let task = tokio::spawn(async move {
            let mut interval = time::interval(tick);
            loop {
                interval.tick().await;

                let session = match resolve_current(&shared, &store).await {
                    Some(session) => session,
                    None => {
                        callback(CountdownTick::Expired);
                        continue;
                    }
                };

                let remaining = store.time_remaining(&session);
                if remaining.expired {
                    callback(CountdownTick::Expired);
                    continue;
                }

                callback(CountdownTick::Running {
                    minutes: remaining.minutes,
                    seconds: remaining.seconds,
                    urgent: remaining.is_urgent(urgent_threshold),
                });
            }
        });

        ClockHandle { task }
    }
}

/// Handle owning one observer's timer task.
#[derive(Debug)]
pub struct ClockHandle {
    task: JoinHandle<()>,
}

impl ClockHandle {
    /// Stop this observer.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        debug!("Countdown observer dropped, stopping timer");
        self.task.abort();
    }
}
