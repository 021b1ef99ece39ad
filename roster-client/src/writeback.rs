//! Write-back coordination.
//!
//! Adapters mark themselves dirty and call [`WriteManager::request_writeback`].
//! Requests are coalesced; the registered callback runs once per burst, and
//! is expected to save every dirty adapter.

use roster_core::DelayConfig;
use std::sync::Arc;

use crate::debounce::DelayedInvocation;

/// Debounced "please persist" requests.
///
/// Cheap to clone; clones share one coalescer.
#[derive(Clone, Debug)]
pub struct WriteManager {
    invocation: Arc<DelayedInvocation<()>>,
}

impl WriteManager {
    /// Run `on_writeback` after each debounced burst of requests.
    pub fn new(config: DelayConfig, on_writeback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            invocation: Arc::new(DelayedInvocation::new(config, move |requests: Vec<()>| {
                tracing::debug!("Writeback after {} requests", requests.len());
                on_writeback();
            })),
        }
    }

    /// Ask for a write-back. Idempotent within a burst.
    pub fn request_writeback(&self) {
        self.invocation.trigger(());
    }

    /// Run the callback now if a request is pending.
    pub fn flush(&self) {
        self.invocation.flush();
    }

    /// Whether a request is waiting for the debounce.
    pub fn is_pending(&self) -> bool {
        self.invocation.pending() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting(config: DelayConfig) -> (WriteManager, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let writeman = WriteManager::new(config, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (writeman, count)
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_coalesced() {
        let (writeman, count) = counting(DelayConfig::new(Duration::from_millis(200), None));

        writeman.request_writeback();
        writeman.clone().request_writeback();
        writeman.request_writeback();
        assert!(writeman.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!writeman.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_runs_callback_once() {
        let (writeman, count) = counting(DelayConfig::new(Duration::from_secs(5), None));

        writeman.request_writeback();
        writeman.flush();
        writeman.flush();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
