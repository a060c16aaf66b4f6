//! Runtime adapter trait and implementations

pub mod bedrock;

use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::ProviderError;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::stream::{ChunkStream, StreamCallbacks};
use crate::types::{ChatRequest, Embedding, EmbeddingRequest, ModelDescriptor};

/// Per-call options
#[derive(Default, Clone)]
pub struct RequestOptions {
    /// Cancels the call, including an in-flight stream
    pub signal: Option<CancellationToken>,
    /// Lifecycle hooks for chat streams
    pub callbacks: Option<Arc<dyn StreamCallbacks>>,
    /// Extra headers forwarded upstream
    pub headers: HeaderMap,
}

impl RequestOptions {
    #[must_use]
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    #[must_use]
    pub fn with_callbacks(mut self, callbacks: Arc<dyn StreamCallbacks>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("signal", &self.signal)
            .field("callbacks", &self.callbacks.is_some())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Capability set every provider adapter implements
///
/// Adapters are built once from an immutable config and shared across
/// concurrent calls.
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    /// Provider identifier
    fn provider(&self) -> &'static str;

    /// Stream a chat completion
    ///
    /// Failures before the stream opens are returned here and reported to
    /// `on_error`; failures mid-stream end the stream with an error item.
    async fn chat(&self, request: &ChatRequest, options: RequestOptions) -> Result<ChunkStream, ProviderError>;

    /// Embed every input, preserving input order
    async fn embeddings(
        &self,
        request: &EmbeddingRequest,
        options: RequestOptions,
    ) -> Result<Vec<Embedding>, ProviderError>;

    /// Models exposed after applying the configured filter
    async fn models(&self) -> Result<Vec<ModelDescriptor>, ProviderError>;
}
