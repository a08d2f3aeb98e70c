use async_trait::async_trait;

use crate::error::Result;
use crate::models::rate_limit::ClientRequestRecord;

/// Shared keyed state holding each client's current window.
///
/// `increment` is the admission primitive: it must open a fresh window when
/// the stored one has elapsed and bump the count, as one atomic step per key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current record for `key`, if one exists and its window is still open.
    async fn get(&self, key: &str, now_ms: i64) -> Result<Option<ClientRequestRecord>>;

    async fn increment(&self, key: &str, now_ms: i64, window_ms: u64)
        -> Result<ClientRequestRecord>;

    /// Drops records whose window ended before `now_ms`. Returns how many
    /// were removed.
    async fn sweep_expired(&self, now_ms: i64) -> Result<usize>;
}
