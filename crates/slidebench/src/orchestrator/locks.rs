//! Per-run mutual exclusion for the step loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tracing::{instrument, trace};

use crate::records::RunId;

/// One async mutex per run, so at most one step per run is in flight while
/// different runs proceed concurrently.
#[derive(Debug, Default)]
pub struct RunLocks {
    locks: Mutex<HashMap<RunId, Arc<tokio::sync::Mutex<()>>>>,
}

impl RunLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder works on `run_id`.
    #[instrument(skip(self))]
    pub async fn acquire(&self, run_id: RunId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(run_id).or_default())
        };
        let guard = lock.lock_owned().await;
        trace!("Run lock acquired");
        guard
    }

    /// Drops the entry of a run that will not step again.
    #[instrument(skip(self))]
    pub fn release(&self, run_id: RunId) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&run_id);
    }

    /// Number of runs with a lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no run has a lock entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_same_run_is_exclusive() {
        let locks = Arc::new(RunLocks::new());
        let run_id = Uuid::new_v4();

        let guard = locks.acquire(run_id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire(run_id).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("Contender acquires after release")
            .expect("Task joins");
    }

    #[tokio::test]
    async fn test_different_runs_do_not_block() {
        let locks = RunLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(Uuid::new_v4()))
            .await
            .expect("Independent run is not blocked");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_release_forgets_run() {
        let locks = RunLocks::new();
        let run_id = Uuid::new_v4();
        drop(locks.acquire(run_id).await);
        locks.release(run_id);
        assert!(locks.is_empty());
    }
}
