//! AWS Bedrock adapter over the Converse and InvokeModel HTTP APIs
//!
//! Authenticates with a Bedrock API key sent as a bearer token, so no SigV4
//! signing or SDK credential chain is involved.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use conduit_config::{BedrockConfig, RuntimeConfig, is_valid_region};
use conduit_core::{AdapterError, ProviderError};
use conduit_telemetry::AdapterMetrics;
use futures_util::future::try_join_all;
use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{RequestOptions, RuntimeAdapter};
use crate::convert::bedrock::{build_request, normalize};
use crate::error::ErrorContext;
use crate::models::{bedrock_catalog, resolve};
use crate::protocol::bedrock::{EmbeddingInvokeRequest, EmbeddingInvokeResponse};
use crate::stream::{ChunkStream, Lifecycle, StreamCallbacks, StreamTranslator, canonical_stream};
use crate::transport::{HttpTransport, OutboundRequest, RetryPolicy, forwardable_headers};
use crate::types::{ChatRequest, Completion, Embedding, EmbeddingRequest, ModelDescriptor};

/// Provider identifier reported in errors and metrics
pub const PROVIDER: &str = "bedrock";

const CONVERSE_STREAM: &str = "converse-stream";
const INVOKE: &str = "invoke";

/// Bedrock runtime adapter
///
/// Immutable after construction; every call owns its own decoder and
/// callback state.
pub struct BedrockAdapter {
    base_url: Url,
    token: SecretString,
    model_list: Option<String>,
    prompt_caching: bool,
    catalog: Vec<ModelDescriptor>,
    transport: HttpTransport,
    errors: ErrorContext,
    metrics: AdapterMetrics,
}

impl BedrockAdapter {
    /// Build an adapter, failing fast on an unusable configuration
    ///
    /// # Errors
    ///
    /// `ConfigurationError` when the token is empty, the region is not a
    /// valid AWS region name, or no base URL can be derived
    pub fn new(config: &BedrockConfig, runtime: &RuntimeConfig) -> Result<Self, ProviderError> {
        let errors = ErrorContext::new(PROVIDER, Some(config.region.clone()), config.token.clone());

        if config.token.expose_secret().trim().is_empty() {
            return Err(errors.wrap(AdapterError::Configuration("bedrock token is empty".to_owned())));
        }

        if !is_valid_region(&config.region) {
            return Err(errors.wrap(AdapterError::Configuration(format!(
                "invalid bedrock region '{}'",
                config.region
            ))));
        }

        let base_url = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => Url::parse(&format!("https://bedrock-runtime.{}.amazonaws.com", config.region))
                .map_err(|e| errors.wrap(AdapterError::Configuration(format!("invalid bedrock endpoint: {e}"))))?,
        };

        if base_url.cannot_be_a_base() {
            return Err(errors.wrap(AdapterError::Configuration(format!(
                "bedrock endpoint '{base_url}' cannot be used as a base URL"
            ))));
        }

        tracing::debug!(
            provider = PROVIDER,
            region = %config.region,
            endpoint = %base_url,
            prompt_caching = config.prompt_caching,
            "bedrock adapter ready"
        );

        Ok(Self {
            base_url,
            token: config.token.clone(),
            model_list: config.model_list.clone(),
            prompt_caching: config.prompt_caching,
            catalog: bedrock_catalog(),
            transport: HttpTransport::new(RetryPolicy::from(runtime)),
            errors,
            metrics: AdapterMetrics::new(),
        })
    }

    /// Replace the built-in model catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: Vec<ModelDescriptor>) -> Self {
        self.catalog = catalog;
        self
    }

    /// `{base}/model/{model}/{operation}`
    fn operation_url(&self, model: &str, operation: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["model", model, operation]);
        }
        url
    }

    /// Send one JSON POST and turn a non-2xx outcome into an error
    async fn post(
        &self,
        url: &Url,
        body: &impl Serialize,
        headers: &HeaderMap,
        signal: Option<&CancellationToken>,
    ) -> Result<reqwest::Response, ProviderError> {
        let body = serde_json::to_vec(body)
            .map_err(|e| self.errors.wrap(AdapterError::Payload(format!("failed to encode request: {e}"))))?;

        let headers = forwardable_headers(headers);
        let request = OutboundRequest {
            url,
            body,
            token: &self.token,
            headers: &headers,
        };

        let response = self
            .transport
            .send(&request, signal)
            .await
            .map_err(|cause| self.errors.wrap(cause))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = self
            .transport
            .read_body(response, signal)
            .await
            .map_err(|cause| self.errors.wrap(cause))?;
        Err(self.errors.wrap(AdapterError::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        }))
    }

    async fn embed_one(
        &self,
        url: &Url,
        input: &str,
        dimensions: Option<u32>,
        headers: &HeaderMap,
        signal: Option<&CancellationToken>,
    ) -> Result<Embedding, ProviderError> {
        let body = EmbeddingInvokeRequest {
            input_text: input.to_owned(),
            dimensions,
            normalize: true,
        };

        let response = self.post(url, &body, headers, signal).await?;

        let raw = self
            .transport
            .read_body(response, signal)
            .await
            .map_err(|cause| self.errors.wrap(cause))?;
        let parsed: EmbeddingInvokeResponse = serde_json::from_slice(&raw).map_err(|e| {
            self.errors
                .wrap(AdapterError::Payload(format!("invalid embedding response: {e}")))
        })?;

        Ok(parsed.embedding)
    }
}

impl std::fmt::Debug for BedrockAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockAdapter")
            .field("base_url", &self.base_url.as_str())
            .field("region", &self.errors.region())
            .field("model_list", &self.model_list)
            .field("prompt_caching", &self.prompt_caching)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RuntimeAdapter for BedrockAdapter {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn chat(&self, request: &ChatRequest, options: RequestOptions) -> Result<ChunkStream, ProviderError> {
        let start = Instant::now();

        let callbacks: Arc<dyn StreamCallbacks> = Arc::new(MeteredCallbacks {
            inner: options.callbacks,
            metrics: self.metrics.clone(),
            model: request.model.clone(),
        });
        let mut lifecycle = Lifecycle::new(Some(callbacks));

        let conversation = normalize(&request.messages);
        let body = build_request(request, conversation, self.prompt_caching);
        let url = self.operation_url(&request.model, CONVERSE_STREAM);

        tracing::debug!(provider = PROVIDER, model = %request.model, "sending converse-stream request");

        let response = match self.post(&url, &body, &options.headers, options.signal.as_ref()).await {
            Ok(response) => response,
            Err(error) => {
                log_failure("chat", &error);
                if error.is_aborted() {
                    lifecycle.abort();
                    self.metrics.record_request(PROVIDER, "chat", "aborted", start);
                } else {
                    lifecycle.error(&error);
                    self.metrics.record_request(PROVIDER, "chat", "error", start);
                }
                return Err(error);
            }
        };

        self.metrics.record_request(PROVIDER, "chat", "ok", start);

        Ok(canonical_stream(
            response.bytes_stream(),
            StreamTranslator::new(request.model.clone()),
            lifecycle,
            self.errors.clone(),
            options.signal.unwrap_or_default(),
        ))
    }

    async fn embeddings(
        &self,
        request: &EmbeddingRequest,
        options: RequestOptions,
    ) -> Result<Vec<Embedding>, ProviderError> {
        if request.input.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let url = self.operation_url(&request.model, INVOKE);
        let signal = options.signal.as_ref();

        tracing::debug!(
            provider = PROVIDER,
            model = %request.model,
            inputs = request.input.len(),
            "fanning out embedding requests"
        );

        // try_join_all keeps results in input order and fails on the first error
        let calls = request
            .input
            .iter()
            .map(|input| self.embed_one(&url, input, request.dimensions, &options.headers, signal));

        match try_join_all(calls).await {
            Ok(embeddings) => {
                self.metrics.record_request(PROVIDER, "embeddings", "ok", start);
                Ok(embeddings)
            }
            Err(error) => {
                log_failure("embeddings", &error);
                let outcome = if error.is_aborted() { "aborted" } else { "error" };
                self.metrics.record_request(PROVIDER, "embeddings", outcome, start);
                Err(error)
            }
        }
    }

    async fn models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let selected: HashSet<String> = resolve(self.model_list.as_deref().unwrap_or_default(), &self.catalog)
            .into_iter()
            .collect();

        Ok(self
            .catalog
            .iter()
            .filter(|model| selected.contains(&model.id))
            .map(|model| ModelDescriptor {
                enabled: true,
                ..model.clone()
            })
            .collect())
    }
}

fn log_failure(operation: &'static str, error: &ProviderError) {
    if error.is_aborted() {
        tracing::debug!(provider = PROVIDER, operation, "request aborted by caller");
    } else {
        tracing::error!(provider = PROVIDER, operation, error = %error, "provider request failed");
    }
}

/// Records token usage on completion, then forwards to the caller's hooks
struct MeteredCallbacks {
    inner: Option<Arc<dyn StreamCallbacks>>,
    metrics: AdapterMetrics,
    model: String,
}

impl StreamCallbacks for MeteredCallbacks {
    fn on_start(&self) {
        if let Some(inner) = &self.inner {
            inner.on_start();
        }
    }

    fn on_text(&self, text: &str) {
        if let Some(inner) = &self.inner {
            inner.on_text(text);
        }
    }

    fn on_finish(&self, completion: &Completion) {
        if let Some(usage) = completion.usage {
            self.metrics
                .record_tokens(PROVIDER, &self.model, usage.input_tokens, usage.output_tokens);
        }
        if let Some(inner) = &self.inner {
            inner.on_finish(completion);
        }
    }

    fn on_error(&self, error: &ProviderError) {
        if let Some(inner) = &self.inner {
            inner.on_error(error);
        }
    }

    fn on_abort(&self) {
        if let Some(inner) = &self.inner {
            inner.on_abort();
        }
    }
}
