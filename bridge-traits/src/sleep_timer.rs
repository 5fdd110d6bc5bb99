//! Sleep timer bridge.

use std::time::Duration;

/// Countdown that stops playback when it expires.
///
/// The coordinator does not manage timer state. It only guarantees that
/// [`SleepTimer::stop`] is called before the service exits so the countdown
/// cannot fire into a torn-down service.
pub trait SleepTimer: Send + Sync {
    /// Start (or restart) the countdown.
    fn start(&self, duration: Duration);

    /// Cancel the countdown. Calling it while idle is a no-op.
    fn stop(&self);

    /// Time left before expiry, or `None` when idle.
    fn remaining(&self) -> Option<Duration>;
}
