//! OpenTelemetry integration for corosync metrics.
//!
//! This module provides OTLP export, recording every numeric or boolean
//! gauge field as an OpenTelemetry gauge named `<measurement>.<field>`.
//! Gauge tags and text fields (such as the quorum ring id) are attached as
//! attributes.
//!
//! # Example
//!
//! ```rust,no_run
//! use corowatch_collector::CorosyncCollector;
//! use corowatch_sdk::otel::OtelConfig;
//! use corowatch_sdk::{Output, Scheduler};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let otel_config = OtelConfig::builder()
//!         .endpoint("http://localhost:4318")
//!         .service_name("corowatch")
//!         .build();
//!
//!     let scheduler = Scheduler::builder(CorosyncCollector::builder().build()?)
//!         .output(Output::otel(otel_config)?)
//!         .interval(Duration::from_secs(10))
//!         .build();
//!
//!     let _handle = scheduler.start();
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use opentelemetry::metrics::{Gauge, Meter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use parking_lot::Mutex;

use corowatch_types::{FieldValue, MetricBatch};

/// Configuration for OpenTelemetry export.
#[derive(Debug, Clone)]
pub struct OtelConfig {
    /// OTLP endpoint (e.g., "http://localhost:4318")
    pub endpoint: String,
    /// Service name for metrics attribution
    pub service_name: String,
}

impl OtelConfig {
    /// Create a new builder for OtelConfig.
    pub fn builder() -> OtelConfigBuilder {
        OtelConfigBuilder::default()
    }
}

/// Builder for OtelConfig.
#[derive(Debug, Default)]
pub struct OtelConfigBuilder {
    endpoint: Option<String>,
    service_name: Option<String>,
}

impl OtelConfigBuilder {
    /// Set the OTLP endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the service name.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build the OtelConfig.
    pub fn build(self) -> OtelConfig {
        OtelConfig {
            endpoint: self
                .endpoint
                .unwrap_or_else(|| "http://localhost:4318".to_string()),
            service_name: self.service_name.unwrap_or_else(|| "corowatch".to_string()),
        }
    }
}

/// OpenTelemetry exporter for corosync metrics.
///
/// Instruments are created the first time a measurement/field pair is seen
/// and reused afterwards.
pub struct OtelExporter {
    meter: Meter,
    _provider: Arc<SdkMeterProvider>,
    gauges: Mutex<HashMap<String, Gauge<u64>>>,
}

impl OtelExporter {
    /// Create a new OtelExporter with the given configuration.
    pub fn new(config: &OtelConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        use opentelemetry_otlp::MetricExporter;
        use opentelemetry_sdk::metrics::PeriodicReader;
        use opentelemetry_sdk::Resource;

        let exporter = MetricExporter::builder()
            .with_http()
            .with_endpoint(format!("{}/v1/metrics", config.endpoint))
            .build()?;

        let reader = PeriodicReader::builder(exporter).build();

        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .build();

        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build();

        let meter = provider.meter("corowatch");

        Ok(Self {
            meter,
            _provider: Arc::new(provider),
            gauges: Mutex::new(HashMap::new()),
        })
    }

    /// Record a batch as OpenTelemetry metrics.
    pub fn record(&self, batch: &MetricBatch) {
        let mut gauges = self.gauges.lock();

        for gauge in &batch.gauges {
            let attributes = attributes_for(gauge);

            for (field, value) in &gauge.fields {
                let Some(v) = value.as_u64() else {
                    continue;
                };
                let name = instrument_name(&gauge.measurement, field);
                let instrument = gauges.entry(name).or_insert_with_key(|name| {
                    self.meter
                        .u64_gauge(name.clone())
                        .with_description(format!("Corosync {field} from {}", gauge.measurement))
                        .build()
                });
                instrument.record(v, &attributes);
            }
        }
    }

    /// Get a reference to the meter for custom metrics.
    pub fn meter(&self) -> &Meter {
        &self.meter
    }
}

fn instrument_name(measurement: &str, field: &str) -> String {
    format!("{measurement}.{field}")
}

/// Tags plus text fields, in key order.
fn attributes_for(gauge: &corowatch_types::Gauge) -> Vec<KeyValue> {
    let tags = gauge
        .tags
        .iter()
        .map(|(k, v)| KeyValue::new(k.clone(), v.clone()));
    let text_fields = gauge.fields.iter().filter_map(|(k, v)| match v {
        FieldValue::Text(text) => Some(KeyValue::new(k.clone(), text.clone())),
        _ => None,
    });
    tags.chain(text_fields).collect()
}

impl std::fmt::Debug for OtelExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtelExporter")
            .field("meter", &"Meter { ... }")
            .field("instruments", &self.gauges.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corowatch_types::Gauge as MetricGauge;

    #[test]
    fn config_defaults() {
        let config = OtelConfig::builder().build();
        assert_eq!(config.endpoint, "http://localhost:4318");
        assert_eq!(config.service_name, "corowatch");
    }

    #[test]
    fn instrument_names_join_measurement_and_field() {
        assert_eq!(
            instrument_name("corosync_quorum", "is_quorate"),
            "corosync_quorum.is_quorate"
        );
    }

    #[test]
    fn text_fields_become_attributes() {
        let gauge = MetricGauge::builder("corosync_quorum")
            .tag("node_id", "1")
            .field("ring_id", "1.2f")
            .field("quorum", 1u32)
            .build();

        let attributes = attributes_for(&gauge);
        assert_eq!(
            attributes,
            vec![
                KeyValue::new("node_id", "1"),
                KeyValue::new("ring_id", "1.2f"),
            ]
        );
    }
}
