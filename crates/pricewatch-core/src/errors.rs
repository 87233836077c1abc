use std::time::Duration;

/// Transport-level failure reaching an upstream endpoint.
///
/// This is the only failure the gateway raises. Non-2xx statuses and
/// malformed bodies are "no data" outcomes, not errors.
#[derive(Clone, Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("connection error to {url}: {reason}")]
    Connection { url: String, reason: String },
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

impl UpstreamError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Timeout { .. } => "timeout",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Connection { url, .. } | Self::Timeout { url, .. } => url,
        }
    }
}

/// An inbound session payload that could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed session payload: {0}")]
    Malformed(String),
    #[error("session payload must be a JSON object")]
    NotAnObject,
}

impl ProtocolError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::NotAnObject => "not_an_object",
        }
    }
}

/// Failure of a single message exchange. The session stays open.
#[derive(Clone, Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("failed to encode response: {0}")]
    Encode(String),
}

impl DispatchError {
    /// Wire code sent back to the client in the error payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::Encode(_) => "INTERNAL_ERROR",
        }
    }

    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Upstream(e) => e.error_kind(),
            Self::InvalidParams(_) => "invalid_params",
            Self::Encode(_) => "encode",
        }
    }
}

/// Errors raised while loading process configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}
