//! Canonical error taxonomy shared by every runtime adapter
//!
//! Adapters construct errors through this module only; nothing here depends
//! on an adapter, so any layer can build or inspect an error without pulling
//! in provider code.

use serde::Serialize;
use thiserror::Error;

/// Maximum number of bytes of an upstream body kept in an error
pub const MAX_ERROR_BODY_BYTES: usize = 1024;

/// Placeholder substituted for secrets found in error text
const REDACTED: &str = "[REDACTED]";

/// Stable, machine-readable error category exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Adapter could not be constructed from its configuration
    ConfigurationError,
    /// Upstream returned a non-2xx status after retries were exhausted
    #[serde(rename = "HTTPError")]
    HttpError,
    /// A streamed frame failed structural validation
    StreamError,
    /// Any other provider failure (exhausted network retries, bad payloads)
    ProviderBizError,
    /// The caller cancelled the request
    AbortError,
}

/// Underlying cause of a provider failure
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Missing credential, invalid region, or otherwise unusable config
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Non-success HTTP status from the provider
    #[error("provider returned HTTP {status}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Truncated, redacted response body
        body: String,
    },

    /// Malformed frame in the response stream
    #[error("malformed stream frame: {0}")]
    Stream(String),

    /// Connection-level failure after all retries
    #[error("network error: {0}")]
    Network(String),

    /// Request or response body could not be encoded or decoded
    #[error("invalid payload: {0}")]
    Payload(String),

    /// Request was cancelled by the caller
    #[error("request aborted")]
    Aborted,
}

impl AdapterError {
    /// Category reported to callers for this cause
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::ConfigurationError,
            Self::Http { .. } => ErrorKind::HttpError,
            Self::Stream(_) => ErrorKind::StreamError,
            Self::Network(_) | Self::Payload(_) => ErrorKind::ProviderBizError,
            Self::Aborted => ErrorKind::AbortError,
        }
    }
}

/// Uniform wrapper carrying provider identity around any adapter failure
#[derive(Debug, Clone, Error)]
#[error("{provider} request failed: {cause}")]
pub struct ProviderError {
    /// Provider identifier (e.g. `bedrock`)
    pub provider: String,
    /// Region the adapter was configured for, if any
    pub region: Option<String>,
    /// What actually went wrong
    #[source]
    pub cause: AdapterError,
}

impl ProviderError {
    /// Wrap a cause with provider context
    pub fn new(provider: impl Into<String>, region: Option<String>, cause: AdapterError) -> Self {
        Self {
            provider: provider.into(),
            region,
            cause,
        }
    }

    /// Category of the wrapped cause
    pub const fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    /// Whether the failure is transient and worth retrying elsewhere
    pub const fn is_retryable(&self) -> bool {
        match &self.cause {
            AdapterError::Http { status, .. } => *status == 429 || *status >= 500,
            AdapterError::Network(_) => true,
            _ => false,
        }
    }

    /// Whether the caller cancelled the request
    pub const fn is_aborted(&self) -> bool {
        matches!(self.cause, AdapterError::Aborted)
    }

    /// Build the serialisable envelope handed to callers
    pub fn envelope(&self) -> ErrorEnvelope {
        let body = match &self.cause {
            AdapterError::Http { body, .. } if !body.is_empty() => Some(body.clone()),
            _ => None,
        };

        ErrorEnvelope {
            kind: self.kind(),
            message: self.cause.to_string(),
            body,
            provider: self.provider.clone(),
            region: self.region.clone(),
        }
    }
}

/// Structured error shape observed by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Stable error category
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Truncated upstream body, when one was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Provider identifier
    pub provider: String,
    /// Provider region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Truncate an upstream body to at most `max` bytes on a char boundary
pub fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_owned();
    }

    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}…[truncated]", &body[..end])
}

/// Replace every occurrence of `secret` in `text`
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_owned();
    }
    text.replace(secret, REDACTED)
}
