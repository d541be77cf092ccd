//! Cached list of curation committee members.
//!
//! The list is refreshed lazily once the TTL has elapsed. Concurrent callers
//! wait on the same refresh instead of each hitting the subgraph.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::types::{normalize_address, Timestamp};

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

#[derive(Debug, Default)]
struct Entry {
    members: Vec<String>,
    fetched_at: Option<Timestamp>,
}

pub struct CommitteeCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: Mutex<Entry>,
}

impl CommitteeCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entry: Mutex::new(Entry::default()),
        }
    }

    /// Current members, refreshed with `fetch` when the cache is stale.
    ///
    /// A failed refresh keeps serving the previous list (empty on first
    /// use) and is retried on the next call.
    pub async fn members<F, Fut>(&self, fetch: F) -> Vec<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, CoreError>>,
    {
        let mut entry = self.entry.lock().await;
        let now = self.clock.now();

        let fresh = entry.fetched_at.is_some_and(|at| {
            chrono::Duration::from_std(self.ttl).is_ok_and(|ttl| now < at + ttl)
        });
        if fresh {
            return entry.members.clone();
        }

        match fetch().await {
            Ok(members) => {
                tracing::debug!(count = members.len(), "Committee members refreshed");
                entry.members = members.iter().map(|m| normalize_address(m)).collect();
                entry.fetched_at = Some(now);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh committee members, serving cached list");
            }
        }
        entry.members.clone()
    }

    pub async fn is_member<F, Fut>(&self, address: &str, fetch: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, CoreError>>,
    {
        let address = normalize_address(address);
        self.members(fetch).await.contains(&address)
    }
}
