use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::models::rate_limit::ClientRequestRecord;
use crate::services::counter_store::CounterStore;

/// In-process counter store for single-instance deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, ClientRequestRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str, now_ms: i64) -> Result<Option<ClientRequestRecord>> {
        Ok(self
            .records
            .get(key)
            .map(|record| *record)
            .filter(|record| !record.is_expired(now_ms)))
    }

    async fn increment(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: u64,
    ) -> Result<ClientRequestRecord> {
        // The entry guard holds the shard write lock until it is dropped.
        let mut record = self
            .records
            .entry(key.to_string())
            .or_insert_with(|| ClientRequestRecord::open(now_ms, window_ms));
        if record.is_expired(now_ms) {
            *record = ClientRequestRecord::open(now_ms, window_ms);
        }
        record.count += 1;
        Ok(*record)
    }

    async fn sweep_expired(&self, now_ms: i64) -> Result<usize> {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now_ms);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
