//! Time sources for phase derivation and hit-penalty timing.
//!
//! Every component takes `now` as an argument; the clock only decides where
//! that value comes from. The front-end uses [`SystemClock`], tests drive a
//! [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source measured from an arbitrary origin.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`], origin at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one
/// handle while a session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn set_secs(&self, secs: f64) {
        self.now.set(Duration::from_secs_f64(secs));
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Fixed-cadence stepping on top of a clock that is polled irregularly.
///
/// The front-end is redrawn on input events as well as on its timer, so it
/// asks the pacer how many whole steps are due instead of stepping once per
/// redraw. A stall longer than `max_catch_up` steps is dropped rather than
/// replayed.
#[derive(Debug, Clone)]
pub struct TickPacer {
    interval: Duration,
    max_catch_up: u32,
    next: Option<Duration>,
}

impl TickPacer {
    pub const DEFAULT_MAX_CATCH_UP: u32 = 4;

    /// Pacer for `tick_hz` steps per second (at least 1 Hz).
    pub fn from_hz(tick_hz: f64) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / tick_hz.max(1.0)))
    }

    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_micros(1)),
            max_catch_up: Self::DEFAULT_MAX_CATCH_UP,
            next: None,
        }
    }

    pub fn with_max_catch_up(mut self, steps: u32) -> Self {
        self.max_catch_up = steps.max(1);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of steps due at `now`. The first call is always one step.
    pub fn due(&mut self, now: Duration) -> u32 {
        let Some(next) = self.next else {
            self.next = Some(now + self.interval);
            return 1;
        };
        if now < next {
            return 0;
        }
        let behind = (now - next).as_nanos() / self.interval.as_nanos();
        let steps = u32::try_from(behind).unwrap_or(u32::MAX).saturating_add(1);
        if steps > self.max_catch_up {
            self.next = Some(now + self.interval);
            return self.max_catch_up;
        }
        self.next = Some(next + self.interval * steps);
        steps
    }

    /// Time left until the next step is due.
    pub fn until_next(&self, now: Duration) -> Duration {
        self.next.map_or(Duration::ZERO, |next| next.saturating_sub(now))
    }
}
