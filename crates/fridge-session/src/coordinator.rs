//! Single-flight session renewal
//!
//! Holds the `renewing` flag and the FIFO queue of waiting callers behind one
//! lock. The check of the flag and its setting happen in the same critical
//! section with no await in between, so two concurrent 401s can never both
//! see "not renewing" and both call the refresh endpoint.
//!
//! The initiating caller's renewal future is spawned onto the runtime rather
//! than polled in place: if the caller that started a renewal is cancelled,
//! the renewal still completes and the other waiters still get their answer.
//!
//! Queue lifecycle:
//! 1. Idle: `renewing == false`, queue empty
//! 2. First caller: flag set, its continuation takes the first slot, renewal spawned
//! 3. Later callers: continuation appended, no second renewal
//! 4. Renewal settles: flag cleared and queue drained in one step, every
//!    continuation receives the same outcome in enqueue order
//! 5. Back to idle

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::RenewalError;
use crate::metrics;

/// New access token, or the reason there is none.
pub type RenewalOutcome = std::result::Result<String, RenewalError>;

#[derive(Default)]
struct RenewalState {
    renewing: bool,
    waiters: VecDeque<oneshot::Sender<RenewalOutcome>>,
}

/// Coordinates renewal so at most one runs at a time.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone, Default)]
pub struct RenewalCoordinator {
    state: Arc<Mutex<RenewalState>>,
}

impl RenewalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a renewal is in flight.
    pub fn is_renewing(&self) -> bool {
        lock(&self.state).renewing
    }

    /// Number of callers waiting on the in-flight renewal.
    pub fn waiting(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Start a renewal, or join the one already running.
    ///
    /// `renew` is only invoked if no renewal is in flight; its future runs on
    /// a spawned task. Every caller, initiator included, resolves to the
    /// outcome of that single renewal.
    pub async fn begin_or_join<F, Fut>(&self, renew: F) -> RenewalOutcome
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = RenewalOutcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let initiator = {
            let mut state = lock(&self.state);
            state.waiters.push_back(tx);
            if state.renewing {
                false
            } else {
                state.renewing = true;
                true
            }
        };

        if initiator {
            debug!("starting session renewal");
            let guard = SettleGuard {
                state: self.state.clone(),
                settled: false,
            };
            let renewal = renew();
            tokio::spawn(async move {
                let outcome = renewal.await;
                guard.settle(outcome);
            });
        } else {
            debug!("renewal already in flight, waiting for it");
            metrics::record_waiter();
        }

        rx.await.unwrap_or(Err(RenewalError::Abandoned))
    }
}

/// Settles the queue exactly once, even if the renewal task panics or is
/// torn down before producing an outcome.
struct SettleGuard {
    state: Arc<Mutex<RenewalState>>,
    settled: bool,
}

impl SettleGuard {
    fn settle(mut self, outcome: RenewalOutcome) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: RenewalOutcome) {
        self.settled = true;
        let waiters = {
            let mut state = lock(&self.state);
            state.renewing = false;
            std::mem::take(&mut state.waiters)
        };

        let label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.label(),
        };
        metrics::record_renewal(label);
        debug!(outcome = label, waiters = waiters.len(), "renewal settled");

        for waiter in waiters {
            // A closed receiver means that caller was cancelled; nothing to deliver.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if !self.settled {
            warn!("renewal task ended without an outcome, releasing waiters");
            self.finish(Err(RenewalError::Abandoned));
        }
    }
}

fn lock(state: &Mutex<RenewalState>) -> MutexGuard<'_, RenewalState> {
    // No code path panics while holding the lock, so a poisoned state is still consistent.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Yield until `waiting()` reaches `n`, so spawned callers are queued.
    async fn until_waiting(coordinator: &RenewalCoordinator, n: usize) {
        for _ in 0..1000 {
            if coordinator.waiting() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} waiters, found {}", coordinator.waiting());
    }

    #[tokio::test]
    async fn single_caller_gets_token_and_state_resets() {
        let coordinator = RenewalCoordinator::new();
        let outcome = coordinator
            .begin_or_join(|| async { RenewalOutcome::Ok("A2".to_string()) })
            .await;
        assert_eq!(outcome, Ok("A2".to_string()));
        assert!(!coordinator.is_renewing());
        assert_eq!(coordinator.waiting(), 0);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_renewal() {
        let coordinator = RenewalCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            let release_rx = release_rx.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .begin_or_join(move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let rx = release_rx.lock().unwrap().take().unwrap();
                        async move {
                            let _ = rx.await;
                            RenewalOutcome::Ok("A2".to_string())
                        }
                    })
                    .await
            }));
        }

        until_waiting(&coordinator, 5).await;
        assert!(coordinator.is_renewing());
        release_tx.send(()).unwrap();

        for h in handles {
            assert_eq!(h.await.unwrap(), Ok("A2".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1, "exactly one renewal");
        assert!(!coordinator.is_renewing());
        assert_eq!(coordinator.waiting(), 0);
    }

    #[tokio::test]
    async fn failure_is_delivered_to_every_waiter() {
        let coordinator = RenewalCoordinator::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let initiator = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .begin_or_join(|| async move {
                        let _ = release_rx.await;
                        RenewalOutcome::Err(RenewalError::Failed("400 Bad Request".into()))
                    })
                    .await
            })
        };
        until_waiting(&coordinator, 1).await;

        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .begin_or_join(|| -> std::future::Ready<RenewalOutcome> {
                        panic!("follower must not renew")
                    })
                    .await
            })
        };
        until_waiting(&coordinator, 2).await;
        release_tx.send(()).unwrap();

        let expected = Err(RenewalError::Failed("400 Bad Request".into()));
        assert_eq!(initiator.await.unwrap(), expected);
        assert_eq!(follower.await.unwrap(), expected);
        assert!(!coordinator.is_renewing());
        assert_eq!(coordinator.waiting(), 0);
    }

    #[tokio::test]
    async fn next_expiry_starts_a_new_renewal() {
        let coordinator = RenewalCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in ["A2", "A3"] {
            let calls = calls.clone();
            let outcome = coordinator
                .begin_or_join(move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { RenewalOutcome::Ok(expected.to_string()) }
                })
                .await;
            assert_eq!(outcome, Ok(expected.to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn panicking_renewal_releases_waiters() {
        let coordinator = RenewalCoordinator::new();
        let outcome = coordinator
            .begin_or_join(|| async {
                let token: Option<String> = None;
                RenewalOutcome::Ok(token.expect("renewal blew up"))
            })
            .await;
        assert_eq!(outcome, Err(RenewalError::Abandoned));
        assert!(!coordinator.is_renewing());
        assert_eq!(coordinator.waiting(), 0);
    }

    #[tokio::test]
    async fn cancelled_initiator_does_not_strand_followers() {
        let coordinator = RenewalCoordinator::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let initiator = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .begin_or_join(|| async move {
                        let _ = release_rx.await;
                        RenewalOutcome::Ok("A2".to_string())
                    })
                    .await
            })
        };
        until_waiting(&coordinator, 1).await;

        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .begin_or_join(|| async { RenewalOutcome::Ok("unused".to_string()) })
                    .await
            })
        };
        until_waiting(&coordinator, 2).await;

        initiator.abort();
        assert!(initiator.await.unwrap_err().is_cancelled());
        release_tx.send(()).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), follower)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Ok("A2".to_string()));
        assert!(!coordinator.is_renewing());
    }
}
