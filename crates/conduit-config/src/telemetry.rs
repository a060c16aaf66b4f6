//! `[telemetry]` section: log output and optional OTLP export

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::runtime::deserialize_duration;

/// Telemetry configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `service.name` resource attribute
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Extra resource attributes attached to every span and metric
    #[serde(default)]
    pub resource_attributes: BTreeMap<String, String>,
    /// Format of the stderr log stream
    #[serde(default)]
    pub log_format: LogFormat,
    /// Fraction of root traces sampled, from 0.0 to 1.0
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// OTLP collector; without it nothing leaves the process
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            resource_attributes: BTreeMap::new(),
            log_format: LogFormat::default(),
            sampling_rate: default_sampling_rate(),
            exporter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// OTLP collector shared by traces and metrics
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: ExportProtocol,
    /// How often metrics are pushed, e.g. `"30s"`
    #[serde(default = "default_export_interval", deserialize_with = "deserialize_duration")]
    pub export_interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    #[default]
    Grpc,
    /// HTTP with protobuf payloads
    HttpProto,
}

fn default_service_name() -> String {
    "conduit".to_owned()
}

const fn default_sampling_rate() -> f64 {
    1.0
}

const fn default_export_interval() -> Duration {
    Duration::from_secs(30)
}
