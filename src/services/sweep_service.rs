use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::services::counter_store::CounterStore;
use crate::utils::time::Clock;

/// Periodic cleanup of elapsed windows. Admission never relies on it having
/// run; it only bounds memory held by clients that went quiet.
#[derive(Clone)]
pub struct SweepService {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl SweepService {
    pub fn new(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn run_once(&self) -> Result<usize> {
        let removed = self.store.sweep_expired(self.clock.now_ms()).await?;
        if removed > 0 {
            debug!(removed, "Swept expired rate limit windows");
        }
        Ok(removed)
    }
}
