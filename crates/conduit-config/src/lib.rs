#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod providers;
pub mod runtime;
pub mod telemetry;

use serde::Deserialize;

pub use providers::*;
pub use runtime::*;
pub use telemetry::{ExportProtocol, ExporterConfig, LogFormat, TelemetryConfig};

/// Top-level conduit configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Transport tunables
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
