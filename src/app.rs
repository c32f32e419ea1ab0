//! Wiring from settings to collector, outputs and scheduler.

use std::ffi::OsString;

use anyhow::{Context, Result};
use clap::ValueEnum;
use corowatch_collector::{CollectError, CorosyncCollector};
use corowatch_sdk::prometheus::{format_prometheus, PrometheusConfig};
use corowatch_sdk::{BatchSource, Output, Scheduler};
use corowatch_types::MetricBatch;
use tracing::{info, warn};

use crate::duration::format_duration;
use crate::settings::{OtelSettings, PrometheusSettings, Settings};

/// Rendering used for `--once` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Pretty-printed JSON batch
    Json,
    /// Prometheus text exposition format
    Prometheus,
}

/// Resolve the tools and build the collector described by `settings`.
pub fn build_collector(settings: &Settings) -> Result<CorosyncCollector, CollectError> {
    let mut builder = CorosyncCollector::builder().use_sudo(settings.use_sudo);
    if let Some(search_path) = &settings.search_path {
        builder = builder.search_path(OsString::from(search_path));
    }
    builder.build()
}

/// Build every output enabled in `settings`.
pub fn build_outputs(settings: &Settings) -> Result<Vec<Output>> {
    let mut outputs = Vec::new();

    if let Some(path) = &settings.output.file {
        outputs.push(Output::file(path));
    }
    if let Some(addr) = &settings.output.tcp {
        outputs.push(Output::tcp(addr));
    }
    if let Some(prometheus) = &settings.prometheus {
        outputs.push(Output::prometheus(prometheus_config(prometheus)));
    }
    if let Some(otel) = &settings.otel {
        outputs.push(otel_output(otel)?);
    }

    Ok(outputs)
}

fn prometheus_config(prometheus: &PrometheusSettings) -> PrometheusConfig {
    let mut builder = PrometheusConfig::builder();
    if let Some(addr) = &prometheus.listen_addr {
        builder = builder.listen_addr(addr);
    }
    if let Some(path) = &prometheus.metrics_path {
        builder = builder.metrics_path(path);
    }
    if let Some(ns) = &prometheus.namespace {
        builder = builder.namespace(ns);
    }
    builder.build()
}

#[cfg(feature = "otel")]
fn otel_output(otel: &OtelSettings) -> Result<Output> {
    use corowatch_sdk::otel::OtelConfig;

    let mut builder = OtelConfig::builder();
    if let Some(endpoint) = &otel.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(name) = &otel.service_name {
        builder = builder.service_name(name);
    }
    Output::otel(builder.build()).map_err(|e| anyhow::anyhow!("failed to create OTLP exporter: {e}"))
}

#[cfg(not(feature = "otel"))]
fn otel_output(_otel: &OtelSettings) -> Result<Output> {
    anyhow::bail!("[otel] is configured but corowatch was built without the `otel` feature")
}

/// Render a batch for standard output.
pub fn render(batch: &MetricBatch, format: Format, namespace: Option<&str>) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(batch).context("failed to encode batch"),
        Format::Prometheus => Ok(format_prometheus(batch, namespace)),
    }
}

/// Run a single cycle, emit it to the configured outputs and render it.
///
/// A failed cycle is returned as an error with no output written.
pub async fn run_once<S: BatchSource>(
    scheduler: &Scheduler<S>,
    format: Format,
    namespace: Option<&str>,
) -> Result<String> {
    let batch = scheduler
        .run_once()
        .await
        .context("collection cycle failed")?;
    render(&batch, format, namespace)
}

/// Collect on the configured interval until interrupted.
pub async fn run_until_interrupted<S: BatchSource>(scheduler: &Scheduler<S>) -> Result<()> {
    if scheduler.outputs().is_empty() {
        warn!("no outputs configured; cycles will only be logged");
    }
    info!(
        interval = %format_duration(scheduler.interval()),
        outputs = scheduler.outputs().len(),
        "starting collection"
    );

    let handle = scheduler.start();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
