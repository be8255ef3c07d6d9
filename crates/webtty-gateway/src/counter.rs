//! Counts active upgraded sessions and lets the orchestrator wait for
//! them to finish.
//!
//! The counter is explicitly constructed and shared between the upgrade
//! handler (which opens sessions) and the lifecycle orchestrator (which
//! drains them at shutdown). There is no global instance.

use tokio::sync::watch;
use tracing::warn;

/// Thread-safe registry of active sessions.
///
/// Cloning is cheap; all clones share the same count.
#[derive(Debug, Clone)]
pub struct SessionCounter {
    count: watch::Sender<usize>,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self {
            count: watch::Sender::new(0),
        }
    }

    /// Register a session. The returned guard decrements the count when
    /// dropped, on every exit path of the session — peer close, protocol
    /// error, idle timeout, or panic unwind.
    pub fn open(&self) -> SessionGuard {
        self.count.send_modify(|c| *c += 1);
        SessionGuard {
            count: self.count.clone(),
        }
    }

    /// Current number of open sessions. Diagnostics only; the value may be
    /// stale by the time the caller looks at it.
    pub fn snapshot(&self) -> usize {
        *self.count.borrow()
    }

    /// Wait until every open session has closed.
    ///
    /// Returns immediately when the count is already zero. `wait_for`
    /// inspects the current value before parking, so a session closing
    /// concurrently with this call cannot be missed.
    pub async fn drain(&self) {
        let mut rx = self.count.subscribe();
        // Cannot fail: `self` keeps the sender side alive for the whole wait.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for SessionCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one open session.
#[derive(Debug)]
pub struct SessionGuard {
    count: watch::Sender<usize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.count.send_modify(|c| {
            if *c == 0 {
                // Unreachable with correctly paired guards; clamp rather
                // than underflow so one bug cannot wedge the drain.
                warn!("session counter underflow");
            } else {
                *c -= 1;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_open_close_nets_to_zero() {
        let counter = SessionCounter::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let c = counter.clone();
            handles.push(tokio::spawn(async move {
                let guard = c.open();
                tokio::time::sleep(Duration::from_millis(1)).await;
                drop(guard);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.snapshot(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_open_guards() {
        let counter = SessionCounter::new();
        let a = counter.open();
        let b = counter.open();
        assert_eq!(counter.snapshot(), 2);
        drop(a);
        assert_eq!(counter.snapshot(), 1);
        drop(b);
        assert_eq!(counter.snapshot(), 0);
    }

    #[tokio::test]
    async fn test_drain_returns_immediately_when_zero() {
        let counter = SessionCounter::new();
        timeout(Duration::from_millis(100), counter.drain())
            .await
            .expect("drain on an empty counter must not block");
    }

    #[tokio::test]
    async fn test_drain_unblocks_on_last_close() {
        let counter = SessionCounter::new();
        let guards: Vec<_> = (0..3).map(|_| counter.open()).collect();

        let drained = {
            let c = counter.clone();
            tokio::spawn(async move { c.drain().await })
        };

        let mut guards = guards.into_iter();
        for _ in 0..2 {
            drop(guards.next().unwrap());
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!drained.is_finished(), "drain returned with sessions open");
        }
        drop(guards.next().unwrap());

        timeout(Duration::from_secs(1), drained)
            .await
            .expect("drain did not unblock after the last close")
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_races_with_concurrent_close() {
        // Regression for the missed-wakeup case: the count reaches zero in
        // the window between snapshotting and subscribing.
        for _ in 0..100 {
            let counter = SessionCounter::new();
            let guard = counter.open();
            let c = counter.clone();
            let closer = tokio::spawn(async move { drop(guard) });
            timeout(Duration::from_secs(1), c.drain())
                .await
                .expect("drain missed a concurrent close");
            closer.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_guard_released_on_panic() {
        let counter = SessionCounter::new();
        let c = counter.clone();
        let task = tokio::spawn(async move {
            let _guard = c.open();
            panic!("session blew up");
        });
        assert!(task.await.is_err());
        assert_eq!(counter.snapshot(), 0);
    }
}
