use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transportation_mode::UnsupportedModeError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error(transparent)]
    UnsupportedMode(#[from] UnsupportedModeError),

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("no route found")]
    NoRouteFound,

    #[error("failed to parse routing response: {0}")]
    Parse(String),

    #[error("cancelled before the request was sent")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedMode,
    Network,
    UpstreamClient,
    UpstreamServer,
    NoRouteFound,
    Parse,
    Cancelled,
    Internal,
}

impl RoutingError {
    /// Transient failures: connection problems, timeouts and provider-side 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            RoutingError::Network(_) => true,
            RoutingError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RoutingError::UnsupportedMode(_) => ErrorKind::UnsupportedMode,
            RoutingError::Network(_) => ErrorKind::Network,
            RoutingError::Upstream { status, .. } if *status >= 500 => ErrorKind::UpstreamServer,
            RoutingError::Upstream { .. } => ErrorKind::UpstreamClient,
            RoutingError::NoRouteFound => ErrorKind::NoRouteFound,
            RoutingError::Parse(_) => ErrorKind::Parse,
            RoutingError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(error: reqwest::Error) -> Self {
        // The request URL carries the API key as a query parameter.
        let error = error.without_url();

        if error.is_decode() {
            RoutingError::Parse(error.to_string())
        } else if let Some(status) = error.status() {
            RoutingError::Upstream {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            RoutingError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for RoutingError {
    fn from(error: serde_json::Error) -> Self {
        RoutingError::Parse(error.to_string())
    }
}

/// Failure of a single property × interest point pair, as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PairError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether asking again later could produce a result.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Network | ErrorKind::UpstreamServer | ErrorKind::Cancelled
        )
    }
}

impl std::fmt::Display for PairError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl From<RoutingError> for PairError {
    fn from(error: RoutingError) -> Self {
        PairError::new(error.kind(), error.to_string())
    }
}
