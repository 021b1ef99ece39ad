//! Tokio driver for the debounce schedule.
//!
//! [`DelayedInvocation`] collects payloads and hands each batch to a sink
//! once the schedule from `roster_core::debounce` says so. One timer task is
//! alive per pending batch; re-arming aborts the previous one.

use roster_core::{DebounceError, DebounceSchedule, DelayConfig, Schedule};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Sink<T> = Arc<dyn Fn(Vec<T>) + Send + Sync>;

/// Batches payloads and delivers them to a sink after a delay.
///
/// Must be triggered from within a tokio runtime. The sink runs on the timer
/// task (or on the caller of [`flush`](Self::flush)) and never under the
/// internal lock, so it may trigger again.
pub struct DelayedInvocation<T: Send + 'static> {
    inner: Arc<Mutex<Inner<T>>>,
    sink: Sink<T>,
}

struct Inner<T> {
    schedule: DebounceSchedule,
    batch: Vec<T>,
    timer: Option<JoinHandle<()>>,
    // Bumped on every re-arm and fire; a timer only fires its own generation.
    generation: u64,
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Send + 'static> DelayedInvocation<T> {
    /// Create an idle coalescer delivering to `sink`.
    pub fn new(config: DelayConfig, sink: impl Fn(Vec<T>) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                schedule: DebounceSchedule::new(config),
                batch: Vec::new(),
                timer: None,
                generation: 0,
            })),
            sink: Arc::new(sink),
        }
    }

    /// Add a payload to the pending batch, arming or moving the timer.
    pub fn trigger(&self, payload: T) {
        let mut inner = lock(&self.inner);
        inner.batch.push(payload);

        let now = Instant::now();
        match inner.schedule.on_trigger(now.into_std()) {
            Schedule::Unchanged => {}
            Schedule::Arm { deadline } => {
                if let Some(timer) = inner.timer.take() {
                    timer.abort();
                }
                inner.generation += 1;
                let generation = inner.generation;
                let weak = Arc::downgrade(&self.inner);
                let sink = Arc::clone(&self.sink);
                inner.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep_until(Instant::from_std(deadline)).await;
                    fire(weak, sink, generation);
                }));
            }
        }
    }

    /// Deliver the pending batch now, if any.
    pub fn flush(&self) {
        let batch = {
            let mut inner = lock(&self.inner);
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.generation += 1;
            inner.schedule.on_fire();
            std::mem::take(&mut inner.batch)
        };
        if !batch.is_empty() {
            (self.sink)(batch);
        }
    }

    /// Number of payloads waiting.
    pub fn pending(&self) -> usize {
        lock(&self.inner).batch.len()
    }

    /// Current settings.
    pub fn config(&self) -> DelayConfig {
        *lock(&self.inner).schedule.config()
    }

    /// Change the delay. Applies from the next trigger on.
    pub fn set_delay_secs(&self, secs: f64) -> Result<(), DebounceError> {
        lock(&self.inner).schedule.config_mut().set_delay_secs(secs)
    }

    /// Change or remove the cap. Applies from the next trigger on.
    pub fn set_max_delay_secs(&self, secs: Option<f64>) -> Result<(), DebounceError> {
        lock(&self.inner)
            .schedule
            .config_mut()
            .set_max_delay_secs(secs)
    }
}

fn fire<T>(inner: Weak<Mutex<Inner<T>>>, sink: Sink<T>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let batch = {
        let mut inner = lock(&inner);
        if inner.generation != generation {
            return;
        }
        inner.generation += 1;
        inner.timer = None;
        let count = inner.schedule.on_fire();
        tracing::trace!("Debounce fired with {} triggers", count);
        std::mem::take(&mut inner.batch)
    };
    if !batch.is_empty() {
        sink(batch);
    }
}

impl<T: Send + 'static> Drop for DelayedInvocation<T> {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.inner).timer.take() {
            timer.abort();
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for DelayedInvocation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("DelayedInvocation")
            .field("config", inner.schedule.config())
            .field("pending", &inner.batch.len())
            .field("armed", &inner.timer.is_some())
            .finish()
    }
}
