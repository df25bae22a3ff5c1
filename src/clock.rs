use std::{thread, time::Duration};

use chrono::{Local, NaiveDateTime};

/// Current local wall-clock time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Suspends the run between sends
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Blocks the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}
