use serde::{Deserialize, Serialize};

/// Object tag carried by every chunk
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// One streamed unit observed by callers, in `OpenAI` chunk shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalChunk {
    /// Synthetic completion ID, stable for the whole stream
    pub id: String,
    /// Always `chat.completion.chunk`
    pub object: String,
    /// Unix timestamp in seconds, non-decreasing across a stream
    pub created: u64,
    /// Model echoed from the request
    pub model: String,
    /// Single choice at index 0
    pub choices: Vec<ChunkChoice>,
}

impl CanonicalChunk {
    /// Text carried by this chunk, if any
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }

    /// Finish reason carried by the terminal chunk
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|c| c.finish_reason)
    }
}

/// Choice within a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Incremental content
    pub delta: ChunkDelta,
    /// Set only on the terminal chunk
    pub finish_reason: Option<FinishReason>,
}

/// Incremental content within a choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Generated text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Reason generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// Model requested tool calls
    ToolCalls,
    /// Content was filtered
    ContentFilter,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub input_tokens: u32,
    /// Tokens generated
    pub output_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// Summary handed to `on_finish` once a stream completes
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// All delta text concatenated
    pub text: String,
    /// Reason generation stopped
    pub finish_reason: FinishReason,
    /// Usage reported by the provider, if any
    pub usage: Option<Usage>,
}
