//! [`Shutdown`] – process-wide stop signal.
//!
//! A latched flag plus a [`Notify`] so that both polling code and async code
//! can observe it. [`Shutdown::trigger`] is synchronous and may be called
//! from a signal-handler thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cloneable stop signal. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the signal and wake every waiter. Idempotent.
    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once [`trigger`](Self::trigger) has been called.
    pub async fn triggered(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent trigger is not missed.
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_untriggered() {
        assert!(!Shutdown::new().is_triggered());
    }

    #[test]
    fn clones_share_state() {
        let a = Shutdown::new();
        let b = a.clone();
        b.trigger();
        assert!(a.is_triggered());
    }

    #[tokio::test]
    async fn triggered_returns_immediately_when_latched() {
        let s = Shutdown::new();
        s.trigger();
        tokio::time::timeout(Duration::from_millis(50), s.triggered())
            .await
            .expect("latched signal must resolve immediately");
    }

    #[tokio::test]
    async fn waiter_wakes_on_trigger_from_another_thread() {
        let s = Shutdown::new();
        let remote = s.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.trigger();
        });
        tokio::time::timeout(Duration::from_secs(2), s.triggered())
            .await
            .expect("waiter must wake after trigger");
    }
}
