//! Per-`ri` serialization for the duration of validate-commit-emit (§5
//! "Ordering guarantees").

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ResourceLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `ri`, creating it on first use. Held across a
    /// single request's validate-commit-emit span.
    pub async fn acquire(&self, ri: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(ri.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_waits_for_first_to_drop() {
        let locks = ResourceLocks::new();
        let guard = locks.acquire("ri1").await;
        let locks = Arc::new(locks);
        let other = locks.clone();
        let handle = tokio::spawn(async move {
            let _g = other.acquire("ri1").await;
        });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        drop(guard);
        handle.await.unwrap();
    }
}
