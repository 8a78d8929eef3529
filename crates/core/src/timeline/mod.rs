#[cfg(test)]
use std::{cell::Cell, rc::Rc};
use std::{
    thread,
    time::{Duration, Instant},
};

/// Time source for the frame pump. Abstracted so the silence heuristic can be
/// exercised without real sleeps.
pub trait FrameClock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl FrameClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Deterministic clock whose `sleep` simply advances the current time.
/// Clones share the same timeline.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ManualClock {
    now: Rc<Cell<Duration>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

#[cfg(test)]
impl FrameClock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Tracks when the engine last received real audio.
#[derive(Debug, Clone)]
pub struct SilenceTimer {
    last_fed: Duration,
    threshold: Duration,
}

impl SilenceTimer {
    pub fn new(now: Duration, threshold: Duration) -> Self {
        Self {
            last_fed: now,
            threshold,
        }
    }

    pub fn record_feed(&mut self, now: Duration) {
        self.last_fed = now;
    }

    /// True once strictly more than the threshold has passed since the last
    /// real feed.
    pub fn is_silent(&self, now: Duration) -> bool {
        now.saturating_sub(self.last_fed) > self.threshold
    }
}
