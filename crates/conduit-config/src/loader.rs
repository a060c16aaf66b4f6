use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, providers::is_valid_region};

/// Upper bound on configured retries
const MAX_RETRIES_LIMIT: u32 = 10;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured or a tunable or
    /// provider setting is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_has_providers()?;
        self.validate_runtime_config()?;
        self.validate_bedrock_config()?;
        self.validate_telemetry_config()?;
        Ok(())
    }

    fn validate_has_providers(&self) -> anyhow::Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured");
        }
        Ok(())
    }

    fn validate_runtime_config(&self) -> anyhow::Result<()> {
        if self.runtime.timeout.is_zero() {
            anyhow::bail!("runtime.timeout must be greater than 0");
        }

        if self.runtime.max_retries > MAX_RETRIES_LIMIT {
            anyhow::bail!("runtime.max_retries exceeds maximum of {MAX_RETRIES_LIMIT}");
        }

        Ok(())
    }

    fn validate_bedrock_config(&self) -> anyhow::Result<()> {
        let Some(ref bedrock) = self.providers.bedrock else {
            return Ok(());
        };

        if bedrock.token.expose_secret().trim().is_empty() {
            anyhow::bail!("providers.bedrock.token must not be empty");
        }

        if !is_valid_region(&bedrock.region) {
            anyhow::bail!("providers.bedrock.region '{}' is not a valid AWS region", bedrock.region);
        }

        Ok(())
    }

    fn validate_telemetry_config(&self) -> anyhow::Result<()> {
        if let Some(ref telemetry) = self.telemetry
            && !(0.0..=1.0).contains(&telemetry.sampling_rate)
        {
            anyhow::bail!("telemetry.sampling_rate must be between 0.0 and 1.0");
        }
        Ok(())
    }
}
