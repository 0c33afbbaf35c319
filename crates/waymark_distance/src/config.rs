use std::sync::Arc;

use jiff::{SignedDuration, SpanRelativeTo};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    cache::{CacheConfig, DistanceCache, MAX_CACHE_TTL},
    concurrency_limiter::{
        ConcurrencyLimiter, DEFAULT_MAX_CONCURRENT_REQUESTS, MAX_CONCURRENT_REQUESTS,
    },
    distance_calculation_service::DistanceCalculationService,
    here_api::{HereConfig, HereRoutingProvider},
    routing_client::{RoutingClient, RoutingConfig},
};

pub const HERE_API_KEY_ENV_VAR: &str = "HERE_API_KEY";
pub const CACHE_TTL_ENV_VAR: &str = "WAYMARK_CACHE_TTL";
pub const CACHE_PRECISION_ENV_VAR: &str = "WAYMARK_CACHE_PRECISION";
pub const CACHE_MAX_ENTRIES_ENV_VAR: &str = "WAYMARK_CACHE_MAX_ENTRIES";
pub const REQUEST_TIMEOUT_ENV_VAR: &str = "WAYMARK_REQUEST_TIMEOUT";
pub const MAX_ATTEMPTS_ENV_VAR: &str = "WAYMARK_MAX_ATTEMPTS";
pub const MAX_CONCURRENT_REQUESTS_ENV_VAR: &str = "WAYMARK_MAX_CONCURRENT_REQUESTS";

/// Coordinates are stored with at most this many decimals.
const MAX_COORDINATE_PRECISION: u8 = 9;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {message}")]
    Invalid {
        name: &'static str,
        value: String,
        message: String,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub here: HereConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

impl EngineConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            here: HereConfig::new(api_key),
            cache: CacheConfig::default(),
            routing: RoutingConfig::default(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for every
    /// variable except the API key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(HERE_API_KEY_ENV_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing(HERE_API_KEY_ENV_VAR))?;

        let mut config = Self::new(api_key);

        if let Some(value) = lookup(CACHE_TTL_ENV_VAR) {
            let ttl = parse_duration(CACHE_TTL_ENV_VAR, &value)?;
            if ttl > MAX_CACHE_TTL {
                return Err(ConfigError::Invalid {
                    name: CACHE_TTL_ENV_VAR,
                    value,
                    message: format!("must be at most {}", MAX_CACHE_TTL),
                });
            }
            config.cache.ttl = ttl;
        }
        if let Some(value) = lookup(CACHE_PRECISION_ENV_VAR) {
            let precision: u8 = parse_number(CACHE_PRECISION_ENV_VAR, &value)?;
            if precision > MAX_COORDINATE_PRECISION {
                return Err(ConfigError::Invalid {
                    name: CACHE_PRECISION_ENV_VAR,
                    value,
                    message: format!("must be at most {}", MAX_COORDINATE_PRECISION),
                });
            }
            config.cache.coordinate_precision = precision;
        }
        if let Some(value) = lookup(CACHE_MAX_ENTRIES_ENV_VAR) {
            config.cache.max_entries = Some(parse_number(CACHE_MAX_ENTRIES_ENV_VAR, &value)?);
        }
        if let Some(value) = lookup(REQUEST_TIMEOUT_ENV_VAR) {
            config.routing.request_timeout = parse_duration(REQUEST_TIMEOUT_ENV_VAR, &value)?;
        }
        if let Some(value) = lookup(MAX_ATTEMPTS_ENV_VAR) {
            config.routing.max_attempts = parse_number(MAX_ATTEMPTS_ENV_VAR, &value)?;
        }
        if let Some(value) = lookup(MAX_CONCURRENT_REQUESTS_ENV_VAR) {
            let max_concurrent: usize = parse_number(MAX_CONCURRENT_REQUESTS_ENV_VAR, &value)?;
            if !(1..=MAX_CONCURRENT_REQUESTS).contains(&max_concurrent) {
                return Err(ConfigError::Invalid {
                    name: MAX_CONCURRENT_REQUESTS_ENV_VAR,
                    value,
                    message: format!("must be between 1 and {}", MAX_CONCURRENT_REQUESTS),
                });
            }
            config.max_concurrent_requests = max_concurrent;
        }

        Ok(config)
    }

    /// Wires the HERE provider, the shared cache and the limiter into a ready service.
    pub fn build_service(
        &self,
    ) -> Result<DistanceCalculationService<HereRoutingProvider>, ConfigError> {
        let provider = HereRoutingProvider::new(self.here.clone(), self.routing.request_timeout)?;
        let client = RoutingClient::new(provider, self.routing.clone());
        let cache = Arc::new(DistanceCache::new(self.cache.clone()));
        let limiter = ConcurrencyLimiter::new(self.max_concurrent_requests);

        info!(
            "EngineConfig: cache ttl {}, precision {}, {} concurrent requests, {} attempts",
            self.cache.ttl,
            self.cache.coordinate_precision,
            limiter.max_concurrent(),
            self.routing.max_attempts
        );

        Ok(DistanceCalculationService::new(client, cache, limiter))
    }
}

/// Accepts `24h`, `PT30S` or a plain number of seconds.
pub fn parse_duration(name: &'static str, value: &str) -> Result<SignedDuration, ConfigError> {
    let invalid = |message: &str| ConfigError::Invalid {
        name,
        value: value.to_string(),
        message: message.to_string(),
    };

    let duration = if let Ok(duration) = value.parse::<SignedDuration>() {
        duration
    } else if let Ok(duration) = value
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        duration
    } else if let Ok(seconds) = value.parse::<i64>() {
        SignedDuration::from_secs(seconds)
    } else {
        return Err(invalid("not a duration"));
    };

    if duration <= SignedDuration::ZERO {
        return Err(invalid("must be positive"));
    }

    Ok(duration)
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| ConfigError::Invalid {
            name,
            value: value.to_string(),
            message: err.to_string(),
        })
}
