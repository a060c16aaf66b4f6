use serde::{Deserialize, Serialize};

/// One embedding vector
pub type Embedding = Vec<f32>;

/// Batch embedding request; one upstream call is made per input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Embedding model identifier
    pub model: String,
    /// Texts to embed, in order
    pub input: Vec<String>,
    /// Requested vector size, when the model supports several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}
