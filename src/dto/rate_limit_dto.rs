use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::rate_limit::{ClientRequestRecord, RateLimitConfig};
use crate::utils::time::from_millis;

pub const TOO_MANY_REQUESTS: &str = "Too Many Requests";
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit reached. Please wait a while before retrying.";

/// Body of every 429 response. Field names are part of the public contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBody {
    pub error: String,
    pub message: String,
    pub retry_after: i64,
}

impl RateLimitedBody {
    pub fn new(retry_after: i64) -> Self {
        Self {
            error: TOO_MANY_REQUESTS.to_string(),
            message: RATE_LIMITED_MESSAGE.to_string(),
            retry_after,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateLimitStatusResponse {
    pub client: String,
    pub limit: u64,
    pub window_ms: u64,
    pub used: u64,
    pub remaining: u64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitStatusResponse {
    pub fn new(
        client: String,
        config: &RateLimitConfig,
        record: Option<ClientRequestRecord>,
    ) -> Self {
        let used = record.map_or(0, |record| record.count);
        Self {
            client,
            limit: config.max_requests,
            window_ms: config.window_ms,
            used,
            remaining: config.max_requests.saturating_sub(used),
            reset_at: record.and_then(|record| from_millis(record.reset_at_ms)),
        }
    }
}
