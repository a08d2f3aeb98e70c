pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::middleware::matcher::RequestMatcher;
use crate::middleware::rate_limit::RateLimiter;
use crate::services::{
    counter_store::CounterStore, memory_store::MemoryStore, redis_store::RedisStore,
};
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub page_limiter: Arc<RateLimiter>,
    pub api_limiter: Arc<RateLimiter>,
    pub store: Arc<dyn CounterStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        page_limiter: Arc<RateLimiter>,
        api_limiter: Arc<RateLimiter>,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            page_limiter,
            api_limiter,
            store,
            clock,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn CounterStore> = match &config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redis { url, key_prefix } => {
                Arc::new(RedisStore::connect(url, key_prefix.as_str()).await?)
            }
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let page_limiter = RateLimiter::new("page", config.page_rate_limit.clone(), store.clone())
            .with_clock(clock.clone())
            .with_matcher(RequestMatcher::new(config.excluded_prefixes.clone()))
            .fail_open(config.fail_open);
        let api_limiter = RateLimiter::new("api", config.api_rate_limit.clone(), store.clone())
            .with_clock(clock.clone())
            .fail_open(config.fail_open);

        Ok(Self::new(
            Arc::new(page_limiter),
            Arc::new(api_limiter),
            store,
            clock,
        ))
    }
}
