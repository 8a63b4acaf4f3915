//! Live session bookkeeping for the session API.
//!
//! Finished sessions stay queryable for a retention period, then a periodic
//! sweep drops them.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::verification::tracker::SessionHandle;

/// How often the sweeper looks for expired sessions.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

struct StoredSession {
    handle: SessionHandle,
    /// When a sweep first saw the session halted.
    halted_at: Option<Instant>,
}

/// Thread-safe map of session id → handle.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<DashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.inner.insert(
            handle.id(),
            StoredSession {
                handle,
                halted_at: None,
            },
        );
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.inner.get(id).map(|r| r.value().handle.clone())
    }

    /// Cancel and forget a session. Returns false if the id is unknown.
    pub fn cancel(&self, id: &Uuid) -> bool {
        match self.inner.remove(id) {
            Some((_, stored)) => {
                stored.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every session; used on host teardown.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.inner.iter() {
            if entry.value().handle.cancel() {
                cancelled += 1;
            }
        }
        self.inner.clear();
        cancelled
    }

    /// Drop sessions that have been halted for at least `retention`.
    ///
    /// A session's retention starts at the first sweep that sees it halted.
    /// Returns how many sessions were removed.
    pub fn sweep(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, stored| {
            if !stored.handle.snapshot().state().is_halted() {
                return true;
            }
            let halted_at = *stored.halted_at.get_or_insert(now);
            now.duration_since(halted_at) < retention
        });
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Swept finished sessions");
        }
        removed
    }

    /// Sweep every `SWEEP_INTERVAL` until the returned task is aborted.
    pub fn spawn_sweeper(&self, retention: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                store.sweep(retention);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Count sessions still verifying vs. finished.
    pub fn summary(&self) -> (usize, usize) {
        let mut verifying = 0;
        let mut finished = 0;
        for entry in self.inner.iter() {
            if entry.value().handle.snapshot().state().is_halted() {
                finished += 1;
            } else {
                verifying += 1;
            }
        }
        (verifying, finished)
    }
}
