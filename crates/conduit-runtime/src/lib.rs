//! Model runtime adapter layer for conduit
//!
//! Normalizes canonical chat requests into a provider's wire format, sends
//! them with bearer auth and bounded retries, and decodes the streamed reply
//! into canonical chunks. AWS Bedrock is the bundled adapter.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod models;
pub mod protocol;
pub mod provider;
pub mod stream;
pub mod transport;
pub mod types;

pub use conduit_core::{AdapterError, ErrorEnvelope, ErrorKind, ProviderError};
pub use error::ErrorContext;
pub use models::{resolve, resolve_to_string};
pub use provider::bedrock::BedrockAdapter;
pub use provider::{RequestOptions, RuntimeAdapter};
pub use stream::{ChunkStream, StreamCallbacks};
pub use transport::{HttpTransport, RetryPolicy};
pub use types::{CanonicalChunk, ChatRequest, Completion, EmbeddingRequest, Message, ModelDescriptor};
