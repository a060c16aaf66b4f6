//! Metric names and the adapter instrument set

use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

pub const ADAPTER_REQUEST_COUNT: &str = "conduit.adapter.request.count";
pub const ADAPTER_REQUEST_DURATION: &str = "conduit.adapter.request.duration";
pub const ADAPTER_TOKEN_USAGE: &str = "conduit.adapter.token.usage";

/// Instruments recorded by runtime adapters
///
/// Backed by the global meter provider, so recording is a no-op until
/// [`crate::init`] installs an exporter.
#[derive(Debug, Clone)]
pub struct AdapterMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
    tokens: Counter<u64>,
}

impl AdapterMetrics {
    pub fn new() -> Self {
        let meter = global::meter("conduit");

        Self {
            requests: meter
                .u64_counter(ADAPTER_REQUEST_COUNT)
                .with_description("Provider calls by operation and outcome")
                .build(),
            duration: meter
                .f64_histogram(ADAPTER_REQUEST_DURATION)
                .with_description("Time until the provider responded")
                .with_unit("s")
                .build(),
            tokens: meter
                .u64_counter(ADAPTER_TOKEN_USAGE)
                .with_description("Tokens reported by providers")
                .build(),
        }
    }

    /// Record one provider call
    pub fn record_request(&self, provider: &'static str, operation: &'static str, outcome: &'static str, start: Instant) {
        let attributes = [
            KeyValue::new("provider", provider),
            KeyValue::new("operation", operation),
            KeyValue::new("outcome", outcome),
        ];

        self.requests.add(1, &attributes);
        self.duration.record(start.elapsed().as_secs_f64(), &attributes);
    }

    /// Record token usage reported at the end of a stream
    pub fn record_tokens(&self, provider: &'static str, model: &str, input: u32, output: u32) {
        let model = KeyValue::new("model", model.to_owned());

        self.tokens.add(
            u64::from(input),
            &[KeyValue::new("provider", provider), model.clone(), KeyValue::new("type", "input")],
        );
        self.tokens.add(
            u64::from(output),
            &[KeyValue::new("provider", provider), model, KeyValue::new("type", "output")],
        );
    }
}

impl Default for AdapterMetrics {
    fn default() -> Self {
        Self::new()
    }
}
