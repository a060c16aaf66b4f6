//! Canonical, provider-agnostic types
//!
//! Callers build requests and consume chunks in these shapes only; every
//! adapter converts to and from its own wire format.

pub mod chunk;
pub mod embedding;
pub mod message;
pub mod model;
pub mod request;
pub mod tool;

pub use chunk::{CanonicalChunk, ChunkChoice, ChunkDelta, Completion, FinishReason, Usage};
pub use embedding::{Embedding, EmbeddingRequest};
pub use message::{Content, ContentPart, FunctionCall, Message, Role, ToolCall};
pub use model::ModelDescriptor;
pub use request::ChatRequest;
pub use tool::{FunctionDefinition, ToolDefinition};
