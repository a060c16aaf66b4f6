//! Bedrock Runtime Converse and `InvokeModel` wire format types

use serde::{Deserialize, Serialize};

// -- Converse request types --

/// Body of `POST /model/{id}/converse-stream`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    /// Conversation turns
    pub messages: Vec<ConverseMessage>,
    /// System prompt blocks (top-level, not in messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<SystemBlock>,
    /// Sampling and length settings
    pub inference_config: InferenceConfig,
    /// Tool definitions, omitted when there are none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
}

/// Converse turn role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverseRole {
    User,
    Assistant,
}

/// Single Converse turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverseMessage {
    /// Author role
    pub role: ConverseRole,
    /// Ordered content blocks
    pub content: Vec<ContentBlock>,
}

/// Content block, serialised as a single-key object (e.g. `{"text": "hi"}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    /// Plain text
    Text(String),
    /// Inline image
    Image(ImageBlock),
    /// Assistant tool invocation
    ToolUse(ToolUseBlock),
    /// Result for a previous tool invocation
    ToolResult(ToolResultBlock),
    /// Reasoning from a previous assistant turn
    ReasoningContent(ReasoningContentBlock),
    /// Prompt cache checkpoint
    CachePoint(CachePoint),
}

/// Inline image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Image format (`png`, `jpeg`, `gif`, `webp`)
    pub format: String,
    /// Image payload
    pub source: ImageSource,
}

/// Image payload holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Base64-encoded image bytes
    pub bytes: String,
}

/// Assistant tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBlock {
    /// Tool call identifier
    pub tool_use_id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments
    pub input: serde_json::Value,
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultBlock {
    /// ID of the tool call this answers
    pub tool_use_id: String,
    /// Result content
    pub content: Vec<ToolResultContent>,
}

/// Tool result content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolResultContent {
    /// Plain text output
    Text(String),
}

/// Reasoning block wrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningContentBlock {
    /// Reasoning text with its signature
    pub reasoning_text: ReasoningText,
}

/// Reasoning text and signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningText {
    /// Reasoning text
    pub text: String,
    /// Signature issued with the reasoning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Prompt cache checkpoint marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePoint {
    /// Cache point type (always `default`)
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for CachePoint {
    fn default() -> Self {
        Self {
            kind: "default".to_owned(),
        }
    }
}

/// System prompt block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SystemBlock {
    /// System instruction text
    Text(String),
    /// Prompt cache checkpoint
    CachePoint(CachePoint),
}

/// Sampling and length settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature in the provider's native range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool entries
    pub tools: Vec<ToolEntry>,
}

/// Tool list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolEntry {
    /// Tool specification
    ToolSpec(ToolSpec),
    /// Prompt cache checkpoint
    CachePoint(CachePoint),
}

/// Tool specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema wrapper
    pub input_schema: ToolInputSchema,
}

/// JSON Schema wrapper for tool input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// JSON Schema document
    pub json: serde_json::Value,
}

// -- Stream frame types --

/// One JSON event payload from the converse stream
///
/// Text deltas, stop markers and usage metadata all arrive as separate
/// frames; any field the adapter does not surface (reasoning deltas, tool
/// input deltas, latency metrics) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFrame {
    /// Content delta (`contentBlockDelta` events)
    #[serde(default)]
    pub delta: Option<FrameDelta>,
    /// Stop reason (`messageStop` events)
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage (`metadata` events)
    #[serde(default)]
    pub usage: Option<FrameUsage>,
}

impl StreamFrame {
    /// Visible text of this frame, excluding empty and whitespace-only deltas
    pub fn text(&self) -> Option<&str> {
        self.delta
            .as_ref()
            .and_then(|d| d.text.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// Content delta
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FrameDelta {
    /// Generated text
    #[serde(default)]
    pub text: Option<String>,
}

/// Usage counters from a `metadata` event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub input_tokens: u32,
    /// Tokens generated
    #[serde(default)]
    pub output_tokens: u32,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u32,
}

// -- InvokeModel embedding types --

/// Body of `POST /model/{id}/invoke` for text embedding models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingInvokeRequest {
    /// Text to embed
    pub input_text: String,
    /// Requested vector size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// Whether to L2-normalise the vector
    pub normalize: bool,
}

/// Embedding model response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingInvokeResponse {
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Tokens consumed by the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text_token_count: Option<u32>,
}
