use conduit_core::{AdapterError, MAX_ERROR_BODY_BYTES, ProviderError, redact, truncate_body};
use secrecy::{ExposeSecret, SecretString};

/// Provider identity attached to every error an adapter surfaces
///
/// Holds the credential only to scrub it from error text.
#[derive(Clone)]
pub struct ErrorContext {
    provider: &'static str,
    region: Option<String>,
    token: SecretString,
}

impl ErrorContext {
    pub const fn new(provider: &'static str, region: Option<String>, token: SecretString) -> Self {
        Self {
            provider,
            region,
            token,
        }
    }

    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Wrap a cause, removing any trace of the credential from its text
    pub fn wrap(&self, cause: AdapterError) -> ProviderError {
        let scrub = |text: String| redact(&text, self.token.expose_secret());

        let cause = match cause {
            AdapterError::Configuration(msg) => AdapterError::Configuration(scrub(msg)),
            AdapterError::Http { status, body } => AdapterError::Http {
                status,
                body: truncate_body(&scrub(body), MAX_ERROR_BODY_BYTES),
            },
            AdapterError::Stream(msg) => AdapterError::Stream(scrub(msg)),
            AdapterError::Network(msg) => AdapterError::Network(scrub(msg)),
            AdapterError::Payload(msg) => AdapterError::Payload(scrub(msg)),
            AdapterError::Aborted => AdapterError::Aborted,
        };

        ProviderError::new(self.provider, self.region.clone(), cause)
    }
}

impl std::fmt::Debug for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorContext")
            .field("provider", &self.provider)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
