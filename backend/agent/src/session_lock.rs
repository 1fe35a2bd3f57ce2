//! Per-session serialization.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per session id. Idle sessions are evicted after ten minutes.
pub struct SessionLocks {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::with_idle(Duration::from_secs(600))
    }

    pub fn with_idle(idle: Duration) -> Self {
        Self {
            locks: Cache::builder().time_to_idle(idle).build(),
        }
    }

    /// Wait for exclusive use of the session.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(session_id.to_string(), || Arc::new(Mutex::new(())));
        lock.lock_owned().await
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_session_is_exclusive() {
        let locks = SessionLocks::new();
        let guard = locks.acquire("s1").await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire("s1")).await;
        assert!(second.is_err());
        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(200), locks.acquire("s1")).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let locks = SessionLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire("b")).await;
        assert!(b.is_ok());
    }
}
