//! Tokio-backed sleep timer.

use bridge_traits::sleep_timer::SleepTimer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type ExpireCallback = Arc<dyn Fn() + Send + Sync>;

/// Deadline offset used when `now + duration` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

struct Countdown {
    generation: u64,
    deadline: Instant,
    cancel: CancellationToken,
}

/// Sleep timer running its countdown as a task on the tokio runtime.
///
/// The runtime handle is captured at construction so `start` can be called
/// from threads that are not runtime workers.
pub struct TokioSleepTimer {
    handle: Handle,
    on_expire: ExpireCallback,
    countdown: Arc<Mutex<Option<Countdown>>>,
    generations: AtomicU64,
}

impl TokioSleepTimer {
    /// Creates a timer bound to the current runtime.
    ///
    /// Returns `None` when called outside a tokio runtime.
    pub fn new<F>(on_expire: F) -> Option<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Handle::try_current()
            .ok()
            .map(|handle| Self::with_handle(handle, on_expire))
    }

    pub fn with_handle<F>(handle: Handle, on_expire: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            handle,
            on_expire: Arc::new(on_expire),
            countdown: Arc::new(Mutex::new(None)),
            generations: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.countdown.lock().is_some()
    }
}

impl SleepTimer for TokioSleepTimer {
    fn start(&self, duration: Duration) {
        let cancel = CancellationToken::new();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let deadline = deadline_after(Instant::now(), duration);
        let previous = self.countdown.lock().replace(Countdown {
            generation,
            deadline,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        info!(secs = duration.as_secs(), "Sleep timer started");

        let countdown = Arc::clone(&self.countdown);
        let on_expire = Arc::clone(&self.on_expire);
        self.handle.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sleep timer cancelled");
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let mut slot = countdown.lock();
                    // A restart or stop may have replaced this countdown.
                    let current = slot.as_ref().map(|active| active.generation) == Some(generation);
                    if current {
                        slot.take();
                        drop(slot);
                        info!("Sleep timer expired");
                        on_expire();
                    } else {
                        warn!("Stale sleep timer fired; ignoring");
                    }
                }
            }
        });
    }

    fn stop(&self) {
        if let Some(countdown) = self.countdown.lock().take() {
            countdown.cancel.cancel();
            debug!("Sleep timer stopped");
        }
    }

    fn remaining(&self) -> Option<Duration> {
        self.countdown
            .lock()
            .as_ref()
            .map(|countdown| countdown.deadline.saturating_duration_since(Instant::now()))
    }
}

fn deadline_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl Drop for TokioSleepTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
