use std::sync::OnceLock;

use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Region used when none is configured
pub const DEFAULT_BEDROCK_REGION: &str = "us-east-1";

/// Configured model providers
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// AWS Bedrock with bearer-token authentication
    #[serde(default)]
    pub bedrock: Option<BedrockConfig>,
}

impl ProvidersConfig {
    /// Whether any provider is configured
    pub const fn is_empty(&self) -> bool {
        self.bedrock.is_none()
    }
}

/// AWS Bedrock-specific configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BedrockConfig {
    /// AWS region embedded in the runtime host name
    #[serde(default = "default_region")]
    pub region: String,
    /// Bedrock API key sent as a bearer token
    pub token: SecretString,
    /// Model filter string (e.g. `all,-us.deepseek.r1-v1:0`)
    #[serde(default)]
    pub model_list: Option<String>,
    /// Base URL override, replacing `https://bedrock-runtime.<region>.amazonaws.com`
    #[serde(default)]
    pub endpoint: Option<Url>,
    /// Annotate the last turn and tool list with cache points
    #[serde(default)]
    pub prompt_caching: bool,
}

impl BedrockConfig {
    /// Minimal configuration with the default region
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            region: default_region(),
            token: SecretString::from(token.into()),
            model_list: None,
            endpoint: None,
            prompt_caching: false,
        }
    }
}

fn default_region() -> String {
    DEFAULT_BEDROCK_REGION.to_string()
}

/// Whether `region` looks like an AWS region (`us-east-1`, `us-gov-west-1`, ...)
pub fn is_valid_region(region: &str) -> bool {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^[a-z]{2}(?:-gov|-iso[a-z]?)?-[a-z]+-\d{1,2}$").expect("must be valid regex"))
    }

    re().is_match(region)
}
