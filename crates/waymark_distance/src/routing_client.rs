use std::{future::Future, time::Duration};

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    distance_request::DistanceRequest, distance_result::DistanceResult, error::RoutingError,
};

/// A single, un-retried request against a routing backend.
pub trait RouteProvider: Send + Sync + 'static {
    fn fetch_route(
        &self,
        request: &DistanceRequest,
    ) -> impl Future<Output = Result<DistanceResult, RoutingError>> + Send;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Applied to each attempt separately.
    pub request_timeout: SignedDuration,

    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_retry_delay: SignedDuration,
    pub max_retry_delay: SignedDuration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            request_timeout: SignedDuration::from_secs(30),
            max_attempts: 3,
            base_retry_delay: SignedDuration::from_millis(500),
            max_retry_delay: SignedDuration::from_secs(8),
        }
    }
}

impl RoutingConfig {
    /// Delay before attempt `attempt + 1`, doubling from the base delay.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_retry_delay.unsigned_abs();
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);

        base.saturating_mul(factor)
            .min(self.max_retry_delay.unsigned_abs())
    }
}

/// Wraps a [`RouteProvider`] with a per-attempt timeout and retries transient failures.
pub struct RoutingClient<P> {
    provider: P,
    config: RoutingConfig,
}

impl<P: RouteProvider> RoutingClient<P> {
    pub fn new(provider: P, config: RoutingConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub async fn fetch_route(
        &self,
        request: &DistanceRequest,
    ) -> Result<DistanceResult, RoutingError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(request).await {
                Ok(result) => return Ok(result),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        "RoutingClient: {} (attempt {}/{}), retrying in {:?}",
                        error, attempt, max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    debug!(
                        "RoutingClient: giving up on {} -> {} after {} attempt(s): {}",
                        request.origin, request.destination, attempt, error
                    );
                    return Err(error);
                }
            }
        }
    }

    async fn attempt(&self, request: &DistanceRequest) -> Result<DistanceResult, RoutingError> {
        let timeout = self.config.request_timeout.unsigned_abs();

        match tokio::time::timeout(timeout, self.provider.fetch_route(request)).await {
            Ok(result) => result,
            Err(_) => Err(RoutingError::Network(format!(
                "request timed out after {:?}",
                timeout
            ))),
        }
    }
}
