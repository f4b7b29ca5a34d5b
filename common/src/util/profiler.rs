use log::Level;
use std::time::{Duration, Instant};

/// Logs how long the enclosing scope took when dropped.
pub struct ScopedTimer {
    name: &'static str,
    level: Level,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self::with_level(name, Level::Info)
    }

    /// For timers that fire every iteration.
    pub fn quiet(name: &'static str) -> Self {
        Self::with_level(name, Level::Debug)
    }

    fn with_level(name: &'static str, level: Level) -> Self {
        Self {
            name,
            level,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::log!(self.level, "{} took {:?}", self.name, self.start.elapsed());
    }
}
