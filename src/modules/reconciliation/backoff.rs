//! Poll interval ladder for the completion reconciler.
//!
//! Unlike a multiplicative retry policy the ladder is an explicit list of
//! rungs: every pass without progress climbs one rung, the last rung is
//! held, and a pass that finds new completions drops back to the first.

use std::time::Duration;

use rand::Rng;

use crate::shared::config::DEFAULT_POLL_LADDER_MS;
use crate::shared::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffLadder {
    rungs: Vec<Duration>,
    /// Upper bound of the random delay added to each sleep
    jitter: Duration,
}

impl BackoffLadder {
    /// Rungs must be non-empty and non-decreasing
    pub fn new(rungs: Vec<Duration>) -> AppResult<Self> {
        if rungs.is_empty() {
            return Err(AppError::ConfigError(
                "Backoff ladder needs at least one interval".to_string(),
            ));
        }
        if let Some(pair) = rungs.windows(2).find(|pair| pair[1] < pair[0]) {
            return Err(AppError::ConfigError(format!(
                "Backoff ladder must not decrease ({:?} followed by {:?})",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            rungs,
            jitter: Duration::ZERO,
        })
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn base(&self) -> Duration {
        self.rungs[0]
    }

    pub fn max(&self) -> Duration {
        self.rungs[self.rungs.len() - 1]
    }

    /// Interval after `attempt` consecutive passes without progress
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).min(self.rungs.len() - 1);
        self.rungs[index]
    }

    /// How long the poll task actually sleeps for a given interval
    pub fn sleep_duration(&self, interval: Duration) -> Duration {
        if self.jitter.is_zero() {
            return interval;
        }

        let jitter_millis = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let random_jitter = rand::thread_rng().gen_range(0..=jitter_millis);
        interval + Duration::from_millis(random_jitter)
    }
}

impl Default for BackoffLadder {
    fn default() -> Self {
        Self {
            rungs: DEFAULT_POLL_LADDER_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            jitter: Duration::ZERO,
        }
    }
}
