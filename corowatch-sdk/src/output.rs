//! Output backends for emitting metric batches.

use std::path::PathBuf;

use corowatch_types::MetricBatch;

#[cfg(any(feature = "otel", feature = "prometheus"))]
use std::sync::Arc;

#[cfg(feature = "otel")]
use crate::otel::{OtelConfig, OtelExporter};

#[cfg(feature = "prometheus")]
use crate::prometheus::{PrometheusConfig, PrometheusExporter};

/// Output destination for metric batches.
///
/// Configure where the scheduler should emit each successful batch.
#[derive(Debug)]
pub enum Output {
    /// Write batches to a JSON file.
    ///
    /// The file is overwritten with each batch.
    File(PathBuf),

    /// Send batches to a TCP server.
    ///
    /// Each batch is sent as a newline-delimited JSON message.
    Tcp(String),

    /// Send batches through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    #[cfg(feature = "tokio")]
    Channel(tokio::sync::mpsc::Sender<MetricBatch>),

    /// Serve the latest batch in Prometheus exposition format over HTTP.
    ///
    /// Use `Output::prometheus()` to create this variant.
    #[cfg(feature = "prometheus")]
    Prometheus(Arc<PrometheusExporter>),

    /// Export batches as OpenTelemetry metrics via OTLP.
    ///
    /// Use `Output::otel()` to create this variant.
    #[cfg(feature = "otel")]
    Otel(Arc<OtelExporter>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use corowatch_sdk::Output;
    ///
    /// let output = Output::file("corosync.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use corowatch_sdk::Output;
    ///
    /// let output = Output::tcp("localhost:9999");
    /// ```
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use corowatch_sdk::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive batches
    /// // while let Some(batch) = rx.recv().await {
    /// //     println!("Got {} gauges", batch.len());
    /// // }
    /// ```
    #[cfg(feature = "tokio")]
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<MetricBatch>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Create a Prometheus output.
    ///
    /// The HTTP server is started by `Scheduler::start`.
    #[cfg(feature = "prometheus")]
    pub fn prometheus(config: PrometheusConfig) -> Self {
        Output::Prometheus(Arc::new(PrometheusExporter::new(config)))
    }

    /// Create an OpenTelemetry OTLP output.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use corowatch_sdk::Output;
    /// use corowatch_sdk::otel::OtelConfig;
    ///
    /// let config = OtelConfig::builder()
    ///     .endpoint("http://localhost:4318")
    ///     .service_name("corowatch")
    ///     .build();
    ///
    /// let output = Output::otel(config).expect("Failed to create OTLP exporter");
    /// ```
    #[cfg(feature = "otel")]
    pub fn otel(config: OtelConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let exporter = OtelExporter::new(&config)?;
        Ok(Output::Otel(Arc::new(exporter)))
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Output::File(_) => "file",
            Output::Tcp(_) => "tcp",
            #[cfg(feature = "tokio")]
            Output::Channel(_) => "channel",
            #[cfg(feature = "prometheus")]
            Output::Prometheus(_) => "prometheus",
            #[cfg(feature = "otel")]
            Output::Otel(_) => "otel",
        }
    }

    /// Emit a batch to this output.
    #[cfg(feature = "tokio")]
    pub(crate) async fn emit(&self, batch: &MetricBatch) -> std::io::Result<()> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(batch)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Tcp(addr) => {
                use tokio::io::AsyncWriteExt;
                use tokio::net::TcpStream;

                // Best effort: a collector that is not listening is not an error
                match TcpStream::connect(addr).await {
                    Ok(mut stream) => {
                        let mut json = serde_json::to_vec(batch)?;
                        json.push(b'\n');
                        stream.write_all(&json).await?;
                    }
                    Err(e) => {
                        tracing::debug!(addr = %addr, error = %e, "tcp output unreachable");
                    }
                }
            }
            Output::Channel(tx) => {
                // Don't block if the receiver is behind
                if tx.try_send(batch.clone()).is_err() {
                    tracing::debug!("channel output full or closed, batch dropped");
                }
            }
            #[cfg(feature = "prometheus")]
            Output::Prometheus(exporter) => {
                exporter.record(batch);
            }
            #[cfg(feature = "otel")]
            Output::Otel(exporter) => {
                exporter.record(batch);
            }
        }
        Ok(())
    }
}
