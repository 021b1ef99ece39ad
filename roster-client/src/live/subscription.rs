//! Subscription guard.

use std::fmt;

/// Registration of an event sink with a live service.
///
/// Delivery stops when the guard is released, either explicitly or by
/// dropping it.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Guard that runs `release` once, when released or dropped.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Guard with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release now.
    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn releases_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_release_does_not_run_twice() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_is_inactive() {
        let sub = Subscription::noop();
        assert_eq!(format!("{:?}", sub), "Subscription { active: false }");
    }
}
