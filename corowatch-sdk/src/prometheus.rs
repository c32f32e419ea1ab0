//! Prometheus exposition format support.
//!
//! This module renders metric batches in the Prometheus text-based
//! exposition format and serves the most recent batch over HTTP, so that
//! Prometheus or a compatible agent can scrape the corosync gauges.
//!
//! Each gauge field becomes one sample named `<measurement>_<field>` with the
//! gauge's tags as labels. Booleans are exported as `1`/`0`. Text fields are
//! exported as an `_info` sample whose value is always `1` and whose label
//! carries the text.
//!
//! ## Example
//!
//! ```rust,no_run
//! use corowatch_collector::CorosyncCollector;
//! use corowatch_sdk::prometheus::PrometheusConfig;
//! use corowatch_sdk::{Output, Scheduler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PrometheusConfig::builder()
//!         .listen_addr("0.0.0.0:9645")
//!         .metrics_path("/metrics")
//!         .build();
//!
//!     let scheduler = Scheduler::builder(CorosyncCollector::builder().build()?)
//!         .output(Output::prometheus(config))
//!         .build();
//!
//!     let _handle = scheduler.start();
//!
//!     // Metrics available at http://localhost:9645/metrics
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use corowatch_types::{FieldValue, MetricBatch};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Configuration for Prometheus metrics endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Address to listen on (e.g., "0.0.0.0:9645")
    pub listen_addr: String,
    /// Path for metrics endpoint (e.g., "/metrics")
    pub metrics_path: String,
    /// Optional namespace prefix for all metrics
    pub namespace: Option<String>,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9645".to_string(),
            metrics_path: "/metrics".to_string(),
            namespace: None,
        }
    }
}

impl PrometheusConfig {
    /// Create a new builder for PrometheusConfig.
    pub fn builder() -> PrometheusConfigBuilder {
        PrometheusConfigBuilder::default()
    }
}

/// Builder for PrometheusConfig.
#[derive(Debug, Default)]
pub struct PrometheusConfigBuilder {
    listen_addr: Option<String>,
    metrics_path: Option<String>,
    namespace: Option<String>,
}

impl PrometheusConfigBuilder {
    /// Set the listen address.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the metrics path.
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    /// Set the namespace prefix for all metrics.
    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    /// Build the PrometheusConfig.
    pub fn build(self) -> PrometheusConfig {
        let defaults = PrometheusConfig::default();
        PrometheusConfig {
            listen_addr: self.listen_addr.unwrap_or(defaults.listen_addr),
            metrics_path: self.metrics_path.unwrap_or(defaults.metrics_path),
            namespace: self.namespace,
        }
    }
}

type BatchStorage = Arc<RwLock<Option<MetricBatch>>>;

/// Prometheus exporter that serves the latest batch over HTTP.
///
/// Nothing is served until the first successful cycle; a failed cycle
/// leaves the previous batch in place.
#[derive(Debug)]
pub struct PrometheusExporter {
    config: PrometheusConfig,
    latest_batch: BatchStorage,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(config: PrometheusConfig) -> Self {
        Self {
            config,
            latest_batch: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PrometheusConfig {
        &self.config
    }

    /// Replace the batch being served.
    pub fn record(&self, batch: &MetricBatch) {
        *self.latest_batch.write() = Some(batch.clone());
    }

    /// Get the current metrics in Prometheus exposition format.
    pub fn render(&self) -> String {
        render_latest(&self.latest_batch, self.config.namespace.as_deref())
    }

    /// Start the HTTP server to serve Prometheus metrics.
    ///
    /// This spawns a background task that listens for HTTP requests and serves
    /// metrics at the configured path, plus `/health` and `/healthz`. The
    /// server runs until the runtime shuts down or the handle is aborted.
    pub fn start_server(&self) -> tokio::task::JoinHandle<()> {
        let config = self.config.clone();
        let storage = self.latest_batch.clone();

        tokio::spawn(async move {
            if let Err(e) = run_server(config, storage).await {
                error!(error = %e, "prometheus server stopped");
            }
        })
    }
}

async fn run_server(
    config: PrometheusConfig,
    storage: BatchStorage,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, path = %config.metrics_path, "serving prometheus metrics");

    let metrics_path: Arc<str> = config.metrics_path.into();
    let namespace: Option<Arc<str>> = config.namespace.map(Into::into);

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let metrics_path = metrics_path.clone();
        let namespace = namespace.clone();
        let storage = storage.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let response =
                    handle_request(req.uri().path(), &metrics_path, namespace.as_deref(), &storage);
                async move { Ok::<_, Infallible>(response) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(peer = %peer, error = %e, "prometheus connection error");
            }
        });
    }
}

fn handle_request(
    path: &str,
    metrics_path: &str,
    namespace: Option<&str>,
    storage: &BatchStorage,
) -> Response<Full<Bytes>> {
    if path == metrics_path {
        text_response(
            StatusCode::OK,
            "text/plain; version=0.0.4; charset=utf-8",
            render_latest(storage, namespace),
        )
    } else if path == "/health" || path == "/healthz" {
        text_response(StatusCode::OK, "text/plain", "OK".to_string())
    } else {
        text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string())
    }
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: String,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn render_latest(storage: &BatchStorage, namespace: Option<&str>) -> String {
    match storage.read().as_ref() {
        Some(batch) => format_prometheus(batch, namespace),
        None => String::new(),
    }
}

/// Format a batch as Prometheus exposition format.
///
/// Families appear in the order their first sample occurs in the batch,
/// each preceded by its `# HELP` and `# TYPE` lines.
pub fn format_prometheus(batch: &MetricBatch, namespace: Option<&str>) -> String {
    let prefix = namespace
        .map(|n| format!("{}_", sanitize_name(n)))
        .unwrap_or_default();

    let mut families: Vec<(String, String, Vec<String>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for gauge in &batch.gauges {
        let measurement = sanitize_name(&gauge.measurement);
        let tag_labels: Vec<String> = gauge
            .tags
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", sanitize_name(k), escape_label_value(v)))
            .collect();

        for (field, value) in &gauge.fields {
            let field_name = sanitize_name(field);
            let (name, help, labels, sample) = match value {
                FieldValue::Text(text) => {
                    let mut labels = tag_labels.clone();
                    labels.push(format!("{}=\"{}\"", field_name, escape_label_value(text)));
                    (
                        format!("{prefix}{measurement}_{field_name}_info"),
                        format!("Current {field} of {}, carried as a label", gauge.measurement),
                        labels,
                        1,
                    )
                }
                other => (
                    format!("{prefix}{measurement}_{field_name}"),
                    format!("Corosync {field} from {}", gauge.measurement),
                    tag_labels.clone(),
                    other.as_u64().unwrap_or_default(),
                ),
            };

            let line = if labels.is_empty() {
                format!("{name} {sample}")
            } else {
                format!("{name}{{{}}} {sample}", labels.join(","))
            };

            match index.get(&name) {
                Some(&i) => families[i].2.push(line),
                None => {
                    index.insert(name.clone(), families.len());
                    families.push((name, help, vec![line]));
                }
            }
        }
    }

    let mut output = String::new();
    for (name, help, samples) in &families {
        let _ = writeln!(output, "# HELP {name} {help}");
        let _ = writeln!(output, "# TYPE {name} gauge");
        for sample in samples {
            output.push_str(sample);
            output.push('\n');
        }
    }

    let _ = writeln!(
        output,
        "# HELP {prefix}corowatch_batch_timestamp_seconds Unix timestamp of the last successful collection"
    );
    let _ = writeln!(output, "# TYPE {prefix}corowatch_batch_timestamp_seconds gauge");
    let _ = writeln!(
        output,
        "{prefix}corowatch_batch_timestamp_seconds {:.3}",
        batch.timestamp_ms as f64 / 1000.0
    );

    output
}

/// Replace characters that are not valid in a metric or label name.
fn sanitize_name(s: &str) -> String {
    s.chars()
        .enumerate()
        .map(|(i, c)| {
            if c.is_ascii_alphabetic() || c == '_' || (i > 0 && c.is_ascii_digit()) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Escape a label value for Prometheus format.
/// Backslash, double-quote, and newline must be escaped.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_batch() -> MetricBatch {
        MetricBatch::builder()
            .timestamp_ms(1703160000000)
            .gauge("corosync_quorum", |g| {
                g.tag("node_id", "1")
                    .field("is_quorate", true)
                    .field("total_nodes", 2u32)
                    .field("ring_id", "1.2f")
                    .field("quorum", 1u32)
            })
            .gauge("corosync_rings", |g| {
                g.tag("ring_id", "0").field("active", 1u32).field("total", 1u32)
            })
            .gauge("corosync_rings", |g| {
                g.tag("ring_id", "1").field("active", 0u32).field("total", 1u32)
            })
            .build()
    }

    #[test]
    fn test_format_prometheus_basic() {
        let output = format_prometheus(&create_test_batch(), None);

        assert!(output.contains("corosync_quorum_is_quorate{node_id=\"1\"} 1\n"));
        assert!(output.contains("corosync_quorum_total_nodes{node_id=\"1\"} 2\n"));
        assert!(output.contains("corosync_quorum_quorum{node_id=\"1\"} 1\n"));
        assert!(output.contains("corosync_rings_active{ring_id=\"0\"} 1\n"));
        assert!(output.contains("corosync_rings_active{ring_id=\"1\"} 0\n"));
    }

    #[test]
    fn false_is_exported_as_zero() {
        let batch = MetricBatch::builder()
            .timestamp_ms(0)
            .gauge("corosync_quorum", |g| g.field("is_quorate", false))
            .build();
        let output = format_prometheus(&batch, None);
        assert!(output.contains("corosync_quorum_is_quorate 0\n"));
    }

    #[test]
    fn text_fields_become_info_samples() {
        let output = format_prometheus(&create_test_batch(), None);

        assert!(output.contains("corosync_quorum_ring_id_info{node_id=\"1\",ring_id=\"1.2f\"} 1\n"));
        assert!(!output.contains("corosync_quorum_ring_id{"));
    }

    #[test]
    fn one_header_per_family() {
        let output = format_prometheus(&create_test_batch(), None);

        assert_eq!(output.matches("# TYPE corosync_rings_active gauge").count(), 1);
        assert_eq!(output.matches("# HELP corosync_rings_total ").count(), 1);

        let header = output.find("# TYPE corosync_rings_active").unwrap();
        let first = output.find("corosync_rings_active{ring_id=\"0\"}").unwrap();
        let second = output.find("corosync_rings_active{ring_id=\"1\"}").unwrap();
        assert!(header < first && first < second);
    }

    #[test]
    fn test_format_prometheus_with_namespace() {
        let output = format_prometheus(&create_test_batch(), Some("cluster"));

        assert!(output.contains("cluster_corosync_quorum_is_quorate{"));
        assert!(output.contains("# HELP cluster_corosync_rings_active"));
        assert!(output.contains("cluster_corowatch_batch_timestamp_seconds"));
    }

    #[test]
    fn test_format_includes_timestamp() {
        let output = format_prometheus(&create_test_batch(), None);
        assert!(output.contains("corowatch_batch_timestamp_seconds 1703160000.000"));
    }

    #[test]
    fn test_empty_batch() {
        let output = format_prometheus(&MetricBatch::with_timestamp(0), None);

        assert!(output.starts_with("# HELP corowatch_batch_timestamp_seconds"));
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("corosync_quorum"), "corosync_quorum");
        assert_eq!(sanitize_name("link.status-2"), "link_status_2");
        assert_eq!(sanitize_name("2node"), "_node");
    }

    #[test]
    fn test_prometheus_config_builder() {
        let config = PrometheusConfig::builder()
            .listen_addr("127.0.0.1:8080")
            .metrics_path("/custom-metrics")
            .namespace("cluster")
            .build();

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.metrics_path, "/custom-metrics");
        assert_eq!(config.namespace, Some("cluster".to_string()));
    }

    #[test]
    fn test_prometheus_config_defaults() {
        let config = PrometheusConfig::builder().build();

        assert_eq!(config.listen_addr, "0.0.0.0:9645");
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_prometheus_exporter_record_and_render() {
        let exporter = PrometheusExporter::new(PrometheusConfig::default());
        assert_eq!(exporter.render(), "");

        exporter.record(&create_test_batch());
        assert!(exporter.render().contains("corosync_rings_total"));
    }

    #[test]
    fn routes() {
        let storage: BatchStorage = Arc::new(RwLock::new(Some(create_test_batch())));

        let metrics = handle_request("/metrics", "/metrics", None, &storage);
        assert_eq!(metrics.status(), StatusCode::OK);
        assert_eq!(
            metrics.headers()[CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );

        for path in ["/health", "/healthz"] {
            assert_eq!(
                handle_request(path, "/metrics", None, &storage).status(),
                StatusCode::OK
            );
        }
        assert_eq!(
            handle_request("/other", "/metrics", None, &storage).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn server_serves_latest_batch() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let exporter = PrometheusExporter::new(
            PrometheusConfig::builder()
                .listen_addr(format!("127.0.0.1:{port}"))
                .build(),
        );
        exporter.record(&create_test_batch());
        let server = exporter.start_server();

        let mut stream = loop {
            match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            }
        };
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("corosync_quorum_is_quorate{node_id=\"1\"} 1"));

        server.abort();
    }
}
