//! Per-suggestion apply tracking.
//!
//! When a batch of suggestions is opened for review, the coordinator owns one
//! finite-state entry per suggestion key. It guards against double-submits,
//! lets independent keys apply concurrently, and ignores writer resolutions
//! that land after the batch was closed or replaced (generation check).
//!
//! The coordinator is kind-agnostic: the actual persistence call is the
//! `writer` future supplied per call. It records the writer's failure reason
//! verbatim and never retries on its own — retry is the caller pressing
//! "apply" again on a failed key.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::suggestion::SuggestionKey;

/// Application state of one suggestion within the open batch.
///
/// Transitions: `Idle → Applying → {Applied | Failed}`; `Failed → Applying`
/// on retry. `Applied` is terminal for the lifetime of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyState {
    Idle,
    Applying,
    Applied,
    Failed(String),
}

/// What an `apply` call actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Writer ran and succeeded.
    Applied,
    /// Writer ran and failed with the recorded reason.
    Failed(String),
    /// Key was already in flight — writer not invoked.
    AlreadyApplying,
    /// Key already applied this batch — writer not invoked.
    AlreadyApplied,
    /// Key does not belong to the open batch — writer not invoked.
    UnknownKey,
    /// The batch was closed or replaced while the writer was in flight;
    /// the resolution was dropped.
    Stale,
}

struct BatchState {
    /// Bumped on every `open`/`close` so in-flight writers from a previous
    /// batch cannot touch the new batch's state.
    generation: u64,
    states: HashMap<SuggestionKey, ApplyState>,
}

/// Tracks apply state for the currently open suggestion batch.
pub struct ApplyCoordinator {
    inner: Mutex<BatchState>,
}

impl Default for ApplyCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BatchState {
                generation: 0,
                states: HashMap::new(),
            }),
        }
    }

    /// Open a new batch: every key starts `Idle`, any prior batch's state is
    /// discarded.
    pub fn open(&self, keys: Vec<SuggestionKey>) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.states = keys.into_iter().map(|k| (k, ApplyState::Idle)).collect();
        log::debug!(
            "ApplyCoordinator: opened batch gen={} with {} keys",
            inner.generation,
            inner.states.len()
        );
    }

    /// Discard all state. In-flight writers are not cancelled; their late
    /// resolutions are dropped by the generation check.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.states.clear();
    }

    /// Run `writer` for `key`, tracking the transition.
    ///
    /// No-ops (without invoking the writer) when the key is unknown, already
    /// applying, or already applied. Concurrent applies for *different* keys
    /// are fully independent. The lock is never held across the await.
    pub async fn apply<F, Fut>(&self, key: &SuggestionKey, writer: F) -> ApplyOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let generation = {
            let mut inner = self.inner.lock();
            match inner.states.get(key) {
                None => return ApplyOutcome::UnknownKey,
                Some(ApplyState::Applying) => {
                    log::debug!("ApplyCoordinator: double-submit ignored for {}", key);
                    return ApplyOutcome::AlreadyApplying;
                }
                Some(ApplyState::Applied) => return ApplyOutcome::AlreadyApplied,
                Some(ApplyState::Idle) | Some(ApplyState::Failed(_)) => {}
            }
            inner.states.insert(key.clone(), ApplyState::Applying);
            inner.generation
        };

        let result = writer().await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            log::debug!("ApplyCoordinator: dropping stale resolution for {}", key);
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(()) => {
                inner.states.insert(key.clone(), ApplyState::Applied);
                log::info!("ApplyCoordinator: applied {}", key);
                ApplyOutcome::Applied
            }
            Err(e) => {
                let reason = e.to_string();
                inner
                    .states
                    .insert(key.clone(), ApplyState::Failed(reason.clone()));
                log::warn!("ApplyCoordinator: apply failed for {}: {}", key, reason);
                ApplyOutcome::Failed(reason)
            }
        }
    }

    /// Current state for a key, if it belongs to the open batch.
    pub fn state(&self, key: &SuggestionKey) -> Option<ApplyState> {
        self.inner.lock().states.get(key).cloned()
    }

    pub fn is_applied(&self, key: &SuggestionKey) -> bool {
        matches!(self.state(key), Some(ApplyState::Applied))
    }

    pub fn is_applying(&self, key: &SuggestionKey) -> bool {
        matches!(self.state(key), Some(ApplyState::Applying))
    }

    /// Number of keys that reached `Applied` in the open batch.
    pub fn applied_count(&self) -> usize {
        self.inner
            .lock()
            .states
            .values()
            .filter(|s| matches!(s, ApplyState::Applied))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::suggestion::EntityKind;

    fn key(i: usize) -> SuggestionKey {
        SuggestionKey::for_index(EntityKind::Goal, i)
    }

    #[tokio::test]
    async fn test_open_starts_all_idle() {
        let coord = ApplyCoordinator::new();
        coord.open(vec![key(0), key(1), key(2)]);

        for i in 0..3 {
            assert_eq!(coord.state(&key(i)), Some(ApplyState::Idle));
            assert!(!coord.is_applied(&key(i)));
            assert!(!coord.is_applying(&key(i)));
        }
        assert_eq!(coord.applied_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_apply_increments_count() {
        let coord = ApplyCoordinator::new();
        coord.open(vec![key(0), key(1)]);

        let outcome = coord.apply(&key(0), || async { Ok(()) }).await;
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert!(coord.is_applied(&key(0)));
        assert_eq!(coord.applied_count(), 1);
        assert_eq!(coord.state(&key(1)), Some(ApplyState::Idle));
    }

    #[tokio::test]
    async fn test_apply_unknown_key_is_noop() {
        let coord = ApplyCoordinator::new();
        coord.open(vec![key(0)]);

        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let outcome = coord
            .apply(&key(9), || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(outcome, ApplyOutcome::UnknownKey);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_double_submit_invokes_writer_once() {
        let coord = Arc::new(ApplyCoordinator::new());
        coord.open(vec![key(0)]);

        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        // First apply parks inside its writer
        let handle = {
            let coord = coord.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                coord
                    .apply(&key(0), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = release_rx.await;
                        Ok(())
                    })
                    .await
            })
        };

        // Let the spawned task reach the writer's await point
        tokio::task::yield_now().await;
        assert!(coord.is_applying(&key(0)));

        // Second submit while in flight — silently ignored, writer not run
        let calls2 = calls.clone();
        let outcome = coord
            .apply(&key(0), move || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(outcome, ApplyOutcome::AlreadyApplying);

        release_tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap(), ApplyOutcome::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(coord.is_applied(&key(0)));
    }

    #[tokio::test]
    async fn test_applied_key_is_terminal() {
        let coord = ApplyCoordinator::new();
        coord.open(vec![key(0)]);

        coord.apply(&key(0), || async { Ok(()) }).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let outcome = coord
            .apply(&key(0), move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(outcome, ApplyOutcome::AlreadyApplied);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(coord.applied_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_key_can_retry_and_does_not_block_others() {
        let coord = ApplyCoordinator::new();
        coord.open(vec![key(0), key(1), key(2)]);

        // Key 1 fails
        let outcome = coord
            .apply(&key(1), || async {
                Err(StoreError::Network("connection reset".into()))
            })
            .await;
        assert!(matches!(outcome, ApplyOutcome::Failed(_)));
        assert_eq!(
            coord.state(&key(1)),
            Some(ApplyState::Failed("Network error: connection reset".into()))
        );

        // Keys 0 and 2 remain independently applicable
        assert_eq!(
            coord.apply(&key(0), || async { Ok(()) }).await,
            ApplyOutcome::Applied
        );
        assert_eq!(
            coord.apply(&key(2), || async { Ok(()) }).await,
            ApplyOutcome::Applied
        );
        assert_eq!(coord.applied_count(), 2);

        // Retry on key 1 succeeds
        assert_eq!(
            coord.apply(&key(1), || async { Ok(()) }).await,
            ApplyOutcome::Applied
        );
        assert_eq!(coord.applied_count(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_applies_for_different_keys() {
        let coord = Arc::new(ApplyCoordinator::new());
        coord.open(vec![key(0), key(1)]);

        let (tx0, rx0) = tokio::sync::oneshot::channel::<()>();
        let h0 = {
            let coord = coord.clone();
            tokio::spawn(async move {
                coord
                    .apply(&key(0), move || async move {
                        let _ = rx0.await;
                        Ok(())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(coord.is_applying(&key(0)));

        // Key 1 applies to completion while key 0 is still in flight
        assert_eq!(
            coord.apply(&key(1), || async { Ok(()) }).await,
            ApplyOutcome::Applied
        );

        tx0.send(()).unwrap();
        assert_eq!(h0.await.unwrap(), ApplyOutcome::Applied);
        assert_eq!(coord.applied_count(), 2);
    }

    #[tokio::test]
    async fn test_late_resolution_after_close_is_dropped() {
        let coord = Arc::new(ApplyCoordinator::new());
        coord.open(vec![key(0)]);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = {
            let coord = coord.clone();
            tokio::spawn(async move {
                coord
                    .apply(&key(0), move || async move {
                        let _ = rx.await;
                        Ok(())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(coord.is_applying(&key(0)));

        // Close mid-flight, then let the writer resolve
        coord.close();
        tx.send(()).unwrap();

        assert_eq!(handle.await.unwrap(), ApplyOutcome::Stale);
        assert_eq!(coord.applied_count(), 0);
        assert_eq!(coord.state(&key(0)), None);
    }

    #[tokio::test]
    async fn test_reopen_resets_prior_batch() {
        let coord = ApplyCoordinator::new();
        coord.open(vec![key(0)]);
        coord.apply(&key(0), || async { Ok(()) }).await;
        assert_eq!(coord.applied_count(), 1);

        coord.open(vec![key(0), key(1)]);
        assert_eq!(coord.applied_count(), 0);
        assert_eq!(coord.state(&key(0)), Some(ApplyState::Idle));
    }
}
