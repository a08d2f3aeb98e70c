use crate::error::{Error, Result};
use crate::middleware::matcher::DEFAULT_EXCLUDED_PREFIXES;
use crate::models::rate_limit::{RateLimitConfig, RateLimitOverrides, RateLimitPreset};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_REDIS_KEY_PREFIX: &str = "quota-guard:ratelimit:";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis { url: String, key_prefix: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub page_rate_limit: RateLimitConfig,
    pub api_rate_limit: RateLimitConfig,
    pub backend: StoreBackend,
    pub fail_open: bool,
    pub sweep_interval: Duration,
    pub excluded_prefixes: Vec<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let page_preset: RateLimitPreset =
            vars.parse_or("RATE_LIMIT_PRESET", RateLimitPreset::Normal)?;
        let page_rate_limit = RateLimitOverrides {
            window_ms: vars.parse_opt("RATE_LIMIT_WINDOW_MS")?,
            max_requests: vars.parse_opt("RATE_LIMIT_MAX_REQUESTS")?,
            ..Default::default()
        }
        .apply_to(page_preset.config())?;

        let api_preset: RateLimitPreset =
            vars.parse_or("API_RATE_LIMIT_PRESET", RateLimitPreset::Api)?;

        let backend = match vars.get("RATE_LIMIT_BACKEND").as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("redis") => StoreBackend::Redis {
                url: vars.require("REDIS_URL")?,
                key_prefix: vars
                    .get("REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_string()),
            },
            Some(other) => {
                return Err(Error::Config(format!(
                    "Invalid value for RATE_LIMIT_BACKEND: {}",
                    other
                )))
            }
        };

        let sweep_secs: u64 = vars.parse_or("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_secs == 0 {
            return Err(Error::Config(
                "Invalid value for SWEEP_INTERVAL_SECS: must be positive".to_string(),
            ));
        }

        let excluded_prefixes = match vars.get("RATE_LIMIT_EXCLUDED_PREFIXES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        };

        Ok(Self {
            server_address: vars.require("SERVER_ADDRESS")?,
            page_rate_limit,
            api_rate_limit: api_preset.config(),
            backend,
            fail_open: vars.parse_or("RATE_LIMIT_FAIL_OPEN", true)?,
            sweep_interval: Duration::from_secs(sweep_secs),
            excluded_prefixes,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .ok_or_else(|| Error::Config(format!("Missing environment variable: {}", name)))
    }

    fn parse_opt<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
            })
            .transpose()
    }

    fn parse_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(name)?.unwrap_or(default))
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
