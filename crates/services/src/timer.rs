use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Periodic tick source for a running quiz session.
///
/// Ticks arrive on the receiver returned by [`TickTimer::start`]; feed each one
/// into the session's `tick`. The background task stops when the timer is
/// cancelled, dropped, or the receiver goes away.
#[derive(Debug)]
pub struct TickTimer {
    handle: JoinHandle<()>,
    reset: Arc<Notify>,
}

impl TickTimer {
    /// Spawn the tick task. The first tick fires one `period` after start.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(8);
        let reset = Arc::new(Notify::new());
        let reset_rx = Arc::clone(&reset);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if tx.send(()).await.is_err() {
                            break;
                        }
                    }
                    () = reset_rx.notified() => interval.reset(),
                }
            }
        });
        (Self { handle, reset }, rx)
    }

    /// One tick per second, the quiz countdown granularity.
    #[must_use]
    pub fn every_second() -> (Self, mpsc::Receiver<()>) {
        Self::start(Duration::from_secs(1))
    }

    /// Start a fresh period from now, e.g. when a new question is shown.
    ///
    /// Ticks already queued on the receiver are not withdrawn.
    pub fn reset(&self) {
        self.reset.notify_one();
    }

    /// Stop producing ticks.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
