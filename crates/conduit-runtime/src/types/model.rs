use serde::{Deserialize, Serialize};

/// Catalog entry for a model a provider can serve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Provider model identifier
    pub id: String,
    /// Whether the model is selected by `all`
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, enabled: bool) -> Self {
        Self {
            id: id.into(),
            enabled,
            display_name: None,
        }
    }
}

const fn default_enabled() -> bool {
    true
}
