use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::utils::time::ceil_div;

/// Per-client state for the window currently in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequestRecord {
    pub count: u64,
    pub reset_at_ms: i64,
}

impl ClientRequestRecord {
    /// A fresh window opening at `now_ms`. The count starts at zero; the
    /// admission check increments it.
    pub fn open(now_ms: i64, window_ms: u64) -> Self {
        let window = i64::try_from(window_ms).unwrap_or(i64::MAX);
        Self {
            count: 0,
            reset_at_ms: now_ms.saturating_add(window),
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.reset_at_ms
    }

    pub fn remaining(&self, max_requests: u64) -> u64 {
        max_requests.saturating_sub(self.count)
    }

    /// Window end as Unix seconds, rounded up.
    pub fn reset_at_secs(&self) -> i64 {
        ceil_div(self.reset_at_ms, 1000)
    }

    /// Whole seconds until the window ends, never negative.
    pub fn retry_after_secs(&self, now_ms: i64) -> i64 {
        ceil_div(self.reset_at_ms.saturating_sub(now_ms), 1000).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    #[validate(range(min = 1))]
    pub window_ms: u64,
    #[validate(range(min = 1))]
    pub max_requests: u64,
    // Accepted for compatibility with existing mount configs; the admission
    // check counts every request regardless.
    #[serde(default)]
    pub skip_successful_requests: bool,
    #[serde(default)]
    pub skip_failed_requests: bool,
}

impl RateLimitConfig {
    pub fn new(window_ms: u64, max_requests: u64) -> Result<Self> {
        let config = Self {
            window_ms,
            max_requests,
            skip_successful_requests: false,
            skip_failed_requests: false,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitPreset::Normal.config()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPreset {
    /// Anti-abuse: 10 requests per minute.
    Strict,
    /// 100 requests per 15 minutes.
    Normal,
    /// 1000 requests per hour.
    Loose,
    /// 30 requests per minute.
    Api,
}

impl RateLimitPreset {
    pub fn config(self) -> RateLimitConfig {
        let (window_ms, max_requests) = match self {
            RateLimitPreset::Strict => (60_000, 10),
            RateLimitPreset::Normal => (15 * 60_000, 100),
            RateLimitPreset::Loose => (60 * 60_000, 1000),
            RateLimitPreset::Api => (60_000, 30),
        };
        RateLimitConfig {
            window_ms,
            max_requests,
            skip_successful_requests: false,
            skip_failed_requests: false,
        }
    }
}

impl std::str::FromStr for RateLimitPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(RateLimitPreset::Strict),
            "normal" => Ok(RateLimitPreset::Normal),
            "loose" => Ok(RateLimitPreset::Loose),
            "api" => Ok(RateLimitPreset::Api),
            other => Err(Error::Config(format!("Unknown rate limit preset: {}", other))),
        }
    }
}

/// Partial config for a single mount point, merged over a preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitOverrides {
    pub window_ms: Option<u64>,
    pub max_requests: Option<u64>,
    pub skip_successful_requests: Option<bool>,
    pub skip_failed_requests: Option<bool>,
}

impl RateLimitOverrides {
    pub fn apply_to(&self, base: RateLimitConfig) -> Result<RateLimitConfig> {
        let merged = RateLimitConfig {
            window_ms: self.window_ms.unwrap_or(base.window_ms),
            max_requests: self.max_requests.unwrap_or(base.max_requests),
            skip_successful_requests: self
                .skip_successful_requests
                .unwrap_or(base.skip_successful_requests),
            skip_failed_requests: self
                .skip_failed_requests
                .unwrap_or(base.skip_failed_requests),
        };
        merged.validate()?;
        Ok(merged)
    }
}
