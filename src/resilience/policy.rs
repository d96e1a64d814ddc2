//! Restart policies for supervised tasks.
//!
//! # Design Decisions
//! - The supervisor asks the policy for the next delay after every exit;
//!   `None` means give up
//! - Policies carry no timers themselves, which keeps them unit-testable
//! - Default is a fixed interval with no attempt cap

use std::time::Duration;

use crate::config::schema::{RestartStrategy, SupervisorConfig};
use crate::resilience::backoff::calculate_backoff;

/// Decides how long to wait before relaunching a failed task.
pub trait RetryPolicy: Send {
    /// Delay before launch number `attempt + 1`, after `attempt` launches
    /// have ended. `None` stops supervision.
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;
}

/// Same delay every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedInterval {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl FixedInterval {
    /// Retry forever at `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl RetryPolicy for FixedInterval {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.interval),
        }
    }
}

/// Doubling delay with jitter, capped at `max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(calculate_backoff(attempt, self.base, self.max)),
        }
    }
}

/// Shortest restart interval accepted from configuration.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Build the policy described by the `[supervisor]` config table.
///
/// An interval below `MIN_INTERVAL` is raised to it.
pub fn from_config(config: &SupervisorConfig) -> Box<dyn RetryPolicy> {
    let mut interval = Duration::from_secs(config.interval_secs);
    if interval < MIN_INTERVAL {
        tracing::warn!(
            interval_secs = config.interval_secs,
            min = ?MIN_INTERVAL,
            "Supervisor interval too short, using minimum"
        );
        interval = MIN_INTERVAL;
    }
    let max_attempts = (config.max_attempts > 0).then_some(config.max_attempts);

    match config.strategy {
        RestartStrategy::Fixed => {
            let mut policy = FixedInterval::new(interval);
            policy.max_attempts = max_attempts;
            Box::new(policy)
        }
        RestartStrategy::Exponential => {
            let max = Duration::from_secs(config.max_delay_secs).max(interval);
            let mut policy = ExponentialBackoff::new(interval, max);
            policy.max_attempts = max_attempts;
            Box::new(policy)
        }
    }
}

impl<P: RetryPolicy + ?Sized> RetryPolicy for Box<P> {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        (**self).next_delay(attempt)
    }
}
