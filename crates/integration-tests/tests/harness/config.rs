//! Adapter construction against a mock endpoint

use std::time::Duration;

use conduit_config::{BedrockConfig, RuntimeConfig};
use conduit_runtime::BedrockAdapter;
use url::Url;

use super::mock_bedrock::MockBedrock;

/// Credential every test adapter is built with
pub const TEST_TOKEN: &str = "test-token-5f2c9a";

/// Runtime settings fast enough for tests
pub fn fast_runtime() -> RuntimeConfig {
    RuntimeConfig {
        timeout: Duration::from_secs(5),
        max_retries: 3,
        backoff_base: Duration::from_millis(10),
    }
}

pub fn bedrock_config(mock: &MockBedrock) -> BedrockConfig {
    bedrock_config_at(mock.endpoint())
}

pub fn bedrock_config_at(endpoint: Url) -> BedrockConfig {
    let mut config = BedrockConfig::new(TEST_TOKEN);
    config.endpoint = Some(endpoint);
    config
}

pub fn adapter(mock: &MockBedrock) -> BedrockAdapter {
    adapter_with(mock, fast_runtime())
}

pub fn adapter_with(mock: &MockBedrock, runtime: RuntimeConfig) -> BedrockAdapter {
    BedrockAdapter::new(&bedrock_config(mock), &runtime).unwrap()
}
