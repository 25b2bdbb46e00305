//! The pool-wide lock.
//!
//! Every mutating pool operation — admission, commit, re-add, flush,
//! eviction — and every consistent read (collation snapshots) serializes
//! through this one lock. That single decision is what keeps nonce
//! cursors from interleaving: there is no schedule of concurrent callers
//! that can observe or produce a half-updated sender state.
//!
//! Fairness: `tokio::sync::Mutex` queues waiters in FIFO order, which is
//! exactly the discipline the pool wants — no caller starves, no
//! priority inversion policy beyond arrival order. There is no mid-flight
//! cancellation of a holder: once a critical section starts it runs to
//! completion, and the guard releases on every exit path because it is a
//! guard.

use tokio::sync::{Mutex, MutexGuard};

/// Pool-wide FIFO mutual exclusion wrapping the guarded pool interior.
///
/// A thin, deliberately boring wrapper: its entire job is to make the
/// locking discipline a named, documented thing rather than a convention
/// scattered across call sites.
#[derive(Debug, Default)]
pub struct PoolLock<T> {
    inner: Mutex<T>,
}

impl<T> PoolLock<T> {
    /// Wrap a value in the pool lock.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquire the lock, waiting in FIFO order behind earlier callers.
    ///
    /// The returned guard must not be held across downstream network I/O
    /// — snapshot under the lock, release, then talk to the world.
    pub async fn exclusive(&self) -> MutexGuard<'_, T> {
        self.inner.lock().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
