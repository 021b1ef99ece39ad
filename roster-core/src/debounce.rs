//! Debounce schedule.
//!
//! Decides when a burst of triggers should be delivered as one batch:
//! - each trigger pushes the fire time to `delay` after the latest trigger
//! - the fire time never moves past `first trigger + max_delay`
//! - once the fire time sits at that cap, further triggers only join the batch
//!
//! The schedule never reads a clock. The caller passes the current instant
//! in and arms a timer for whatever deadline comes back.

use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by invalid delay settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DebounceError {
    /// Delay was below zero.
    #[error("delay must not be negative (got {0})")]
    NegativeDelay(f64),

    /// Maximum delay was below zero.
    #[error("max_delay must not be negative (got {0})")]
    NegativeMaxDelay(f64),

    /// Delay was NaN or infinite.
    #[error("delay must be a finite number of seconds")]
    NotFinite,
}

/// Delay settings of a debounce schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayConfig {
    delay: Duration,
    max_delay: Option<Duration>,
}

impl DelayConfig {
    /// Build from durations, which cannot be negative.
    pub fn new(delay: Duration, max_delay: Option<Duration>) -> Self {
        Self { delay, max_delay }
    }

    /// Build from seconds, rejecting negative or non-finite values.
    pub fn from_secs_f64(delay: f64, max_delay: Option<f64>) -> Result<Self, DebounceError> {
        let delay = delay_from_secs(delay, DebounceError::NegativeDelay)?;
        let max_delay = max_delay
            .map(|secs| delay_from_secs(secs, DebounceError::NegativeMaxDelay))
            .transpose()?;
        Ok(Self { delay, max_delay })
    }

    /// Delay after the latest trigger.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cap measured from the first trigger of a batch.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Replace the delay.
    pub fn set_delay_secs(&mut self, secs: f64) -> Result<(), DebounceError> {
        self.delay = delay_from_secs(secs, DebounceError::NegativeDelay)?;
        Ok(())
    }

    /// Replace or remove the cap.
    pub fn set_max_delay_secs(&mut self, secs: Option<f64>) -> Result<(), DebounceError> {
        self.max_delay = secs
            .map(|secs| delay_from_secs(secs, DebounceError::NegativeMaxDelay))
            .transpose()?;
        Ok(())
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_delay: Some(Duration::from_secs(10)),
        }
    }
}

fn delay_from_secs(
    secs: f64,
    negative: impl FnOnce(f64) -> DebounceError,
) -> Result<Duration, DebounceError> {
    if !secs.is_finite() {
        return Err(DebounceError::NotFinite);
    }
    if secs < 0.0 {
        return Err(negative(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// What the caller must do with its timer after a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Cancel any pending timer and fire at `deadline`.
    Arm {
        /// When the batch should be delivered.
        deadline: Instant,
    },
    /// Keep the pending timer as it is.
    Unchanged,
}

/// Pure debounce state for one batch at a time.
#[derive(Debug, Clone)]
pub struct DebounceSchedule {
    config: DelayConfig,
    pending: usize,
    first_at: Option<Instant>,
    deadline: Option<Instant>,
}

impl DebounceSchedule {
    /// Create an idle schedule.
    pub fn new(config: DelayConfig) -> Self {
        Self {
            config,
            pending: 0,
            first_at: None,
            deadline: None,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &DelayConfig {
        &self.config
    }

    /// Mutable settings. Changes apply from the next trigger on.
    pub fn config_mut(&mut self) -> &mut DelayConfig {
        &mut self.config
    }

    /// Record a trigger at `now`.
    pub fn on_trigger(&mut self, now: Instant) -> Schedule {
        self.pending += 1;

        let first_at = *self.first_at.get_or_insert(now);
        let mut candidate = now + self.config.delay;
        if let Some(max_delay) = self.config.max_delay {
            candidate = candidate.min(first_at + max_delay);
        }

        match self.deadline {
            Some(deadline) if candidate <= deadline => Schedule::Unchanged,
            _ => {
                self.deadline = Some(candidate);
                Schedule::Arm {
                    deadline: candidate,
                }
            }
        }
    }

    /// The batch was delivered. Returns how many triggers it held.
    pub fn on_fire(&mut self) -> usize {
        let pending = self.pending;
        self.pending = 0;
        self.first_at = None;
        self.deadline = None;
        pending
    }

    /// Deadline of the current batch, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of triggers in the current batch.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Check if no batch is pending.
    pub fn is_idle(&self) -> bool {
        self.pending == 0
    }
}
