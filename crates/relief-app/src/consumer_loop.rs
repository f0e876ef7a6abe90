//! Fixed-interval loop that drives pipeline deliveries on the current thread.
//!
//! Stands in for a frame loop: each iteration calls the tick function once,
//! then sleeps for whatever remains of the interval.

use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

/// Default delay between ticks: roughly one 60 Hz frame.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// How a [`ConsumerLoop::run`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The tick function reported completion.
    Finished { ticks: u64 },
    /// The timeout expired first.
    TimedOut { ticks: u64 },
}

impl LoopOutcome {
    pub fn ticks(&self) -> u64 {
        match *self {
            Self::Finished { ticks } | Self::TimedOut { ticks } => ticks,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// Fixed-interval tick loop with an overall timeout.
pub struct ConsumerLoop {
    interval: Duration,
    timeout: Duration,
    tick_count: u64,
    overrun_count: u64,
}

impl ConsumerLoop {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            tick_count: 0,
            overrun_count: 0,
        }
    }

    /// Call `tick_fn` once per interval until it returns `true` or the
    /// timeout expires. The first tick runs immediately.
    pub fn run(&mut self, mut tick_fn: impl FnMut() -> bool) -> LoopOutcome {
        let started = Instant::now();
        let mut ticks = 0;

        loop {
            let tick_started = Instant::now();
            ticks += 1;
            self.tick_count += 1;

            if tick_fn() {
                return LoopOutcome::Finished { ticks };
            }
            if started.elapsed() >= self.timeout {
                return LoopOutcome::TimedOut { ticks };
            }

            let spent = tick_started.elapsed();
            match self.interval.checked_sub(spent) {
                Some(remaining) => thread::sleep(remaining),
                None => {
                    self.overrun_count += 1;
                    warn!(
                        "Tick took {:.1}ms, longer than the {:.1}ms interval",
                        spent.as_secs_f64() * 1000.0,
                        self.interval.as_secs_f64() * 1000.0
                    );
                }
            }
        }
    }

    /// Ticks executed across every [`run`](Self::run).
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks that took longer than the interval.
    pub fn overrun_count(&self) -> u64 {
        self.overrun_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for ConsumerLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL, Duration::from_secs(60))
    }
}
