// src/scheduler.rs
use crate::scraper::fetcher::{Sleeper, ThreadSleeper};
use std::fmt::Display;
use std::time::Duration;
use tracing::{error, info};

/// Runs a job once right away, then once per interval. A failing run is
/// logged and the next one still happens.
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn run<F, E>(&self, mut job: F) -> !
    where
        F: FnMut() -> Result<(), E>,
        E: Display,
    {
        info!(
            "Starting apartment tracker scheduler (every {} min)...",
            self.interval.as_secs() / 60
        );
        self.tick(&mut job);
        loop {
            ThreadSleeper.sleep(self.interval);
            self.tick(&mut job);
        }
    }

    /// Same as `run`, but stops after `runs` executions.
    #[cfg(test)]
    pub(crate) fn run_times<S, F, E>(&self, sleeper: &S, runs: usize, mut job: F)
    where
        S: Sleeper,
        F: FnMut() -> Result<(), E>,
        E: Display,
    {
        for i in 0..runs {
            if i > 0 {
                sleeper.sleep(self.interval);
            }
            self.tick(&mut job);
        }
    }

    fn tick<F, E>(&self, job: &mut F)
    where
        F: FnMut() -> Result<(), E>,
        E: Display,
    {
        if let Err(e) = job() {
            error!("Cycle failed: {e}");
        }
    }
}
