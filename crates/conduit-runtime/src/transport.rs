//! Authenticated HTTP transport with bounded retries
//!
//! Each attempt is bounded by the request timeout and raced against the
//! caller's cancellation token. 429 and 5xx responses, timeouts and
//! connection failures are retried with exponential backoff; any other
//! response is handed back untouched.

use std::time::Duration;

use bytes::Bytes;
use conduit_config::RuntimeConfig;
use conduit_core::AdapterError;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HOST, HeaderMap};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upper bound on the backoff exponent
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Retry and timeout settings for [`HttpTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Timeout for one attempt, until response headers arrive
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each subsequent one
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.min(MAX_BACKOFF_EXPONENT)))
    }
}

impl From<&RuntimeConfig> for RetryPolicy {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

/// Whether a status is transient and worth another attempt
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Headers callers may not override
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    forwarded.remove(AUTHORIZATION);
    forwarded.remove(CONTENT_TYPE);
    forwarded.remove(HOST);
    forwarded
}

/// One JSON POST to send
pub struct OutboundRequest<'a> {
    pub url: &'a Url,
    /// Serialised JSON body
    pub body: Vec<u8>,
    pub token: &'a SecretString,
    /// Extra headers, already filtered with [`forwardable_headers`]
    pub headers: &'a HeaderMap,
}

/// Shared HTTP client plus retry policy
///
/// Holds no per-request state; safe to share across concurrent calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            policy,
        }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// POST `request`, retrying transient failures
    ///
    /// Non-retryable responses (2xx, 4xx other than 429) are returned on the
    /// first attempt. Once retries are exhausted the last response is
    /// returned as-is, or the last network failure becomes
    /// [`AdapterError::Network`].
    ///
    /// # Errors
    ///
    /// [`AdapterError::Aborted`] if `signal` fires, [`AdapterError::Network`]
    /// if every attempt failed before a response arrived
    pub async fn send(
        &self,
        request: &OutboundRequest<'_>,
        signal: Option<&CancellationToken>,
    ) -> Result<Response, AdapterError> {
        let mut attempt = 0;

        loop {
            let pending = self
                .client
                .post(request.url.clone())
                .headers(request.headers.clone())
                .bearer_auth(request.token.expose_secret())
                .header(CONTENT_TYPE, "application/json")
                .body(request.body.clone())
                .send();

            let outcome = tokio::select! {
                biased;
                () = cancelled(signal) => return Err(AdapterError::Aborted),
                outcome = tokio::time::timeout(self.policy.timeout, pending) => outcome,
            };

            let exhausted = attempt >= self.policy.max_retries;

            let reason = match outcome {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if !is_retryable_status(status) || exhausted {
                        tracing::debug!(%status, attempt, "provider responded");
                        return Ok(response);
                    }
                    format!("HTTP {status}")
                }
                Ok(Err(e)) => {
                    let message = transport_error_message(&e);
                    if exhausted {
                        return Err(AdapterError::Network(message));
                    }
                    message
                }
                Err(_) => {
                    let message = format!("request timed out after {:?}", self.policy.timeout);
                    if exhausted {
                        return Err(AdapterError::Network(message));
                    }
                    message
                }
            };

            let delay = self.policy.delay_for(attempt);
            #[allow(clippy::cast_possible_truncation)]
            let delay_ms = delay.as_millis() as u64;
            tracing::warn!(attempt, delay_ms, reason = %reason, "retrying provider request");

            tokio::select! {
                biased;
                () = cancelled(signal) => return Err(AdapterError::Aborted),
                () = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }

    /// Read a whole (non-streamed) response body
    ///
    /// Bounded by the request timeout and raced against `signal`.
    ///
    /// # Errors
    ///
    /// [`AdapterError::Aborted`] if `signal` fires, [`AdapterError::Network`]
    /// if the body times out or the connection fails mid-body
    pub async fn read_body(
        &self,
        response: Response,
        signal: Option<&CancellationToken>,
    ) -> Result<Bytes, AdapterError> {
        let outcome = tokio::select! {
            biased;
            () = cancelled(signal) => return Err(AdapterError::Aborted),
            outcome = tokio::time::timeout(self.policy.timeout, response.bytes()) => outcome,
        };

        match outcome {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => Err(AdapterError::Network(transport_error_message(&e))),
            Err(_) => Err(AdapterError::Network(format!(
                "response body timed out after {:?}",
                self.policy.timeout
            ))),
        }
    }
}

/// Resolves when `signal` is cancelled; never resolves without one
async fn cancelled(signal: Option<&CancellationToken>) {
    match signal {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Describe a reqwest failure without the request URL's query or headers
fn transport_error_message(error: &reqwest::Error) -> String {
    let kind = if error.is_connect() {
        "connection failed"
    } else if error.is_timeout() {
        "timed out"
    } else if error.is_body() || error.is_decode() {
        "invalid response body"
    } else {
        "request failed"
    };

    match std::error::Error::source(error) {
        Some(source) => format!("{kind}: {source}"),
        None => kind.to_owned(),
    }
}
