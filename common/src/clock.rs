use chrono::{DateTime, Local};
use std::time::Duration;

/// Source of sample timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The local wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Blocks the calling thread between polls.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
