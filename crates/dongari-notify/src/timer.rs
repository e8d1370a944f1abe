//! One-shot cancellable timers on the tokio runtime.
//!
//! Recurring triggers are deliberately NOT armed with a repeating
//! primitive: the fire callback re-arms after each fire, so the registry
//! can cancel or replace a job between occurrences while holding its lock.

use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Handle to a pending (or already fired) timer.
///
/// Disarming is idempotent: aborting a finished task is a no-op, and so
/// is disarming twice.
#[derive(Debug)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Cancel the pending timer. Safe on fired or already-disarmed handles.
    pub fn disarm(&self) {
        self.abort.abort();
    }
}

/// Arm a one-shot timer: after `delay`, run `fire`.
///
/// A zero delay fires on the next runtime poll — this is the explicit
/// catch-up path for overdue one-off notices.
pub fn arm<F>(delay: Duration, fire: F) -> TimerHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        fire.await;
    });
    TimerHandle {
        abort: handle.abort_handle(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let _handle = arm(Duration::from_secs(5), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });
        // Let the spawned task register its sleep before moving the clock.
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_before_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let handle = arm(Duration::from_secs(5), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;

        handle.disarm();
        // Disarming twice is fine.
        handle.disarm();

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_fires_immediately() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let _handle = arm(Duration::ZERO, async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
