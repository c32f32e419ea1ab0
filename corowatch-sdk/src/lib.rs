//! # corowatch-sdk
//!
//! Scheduling and emission for corosync quorum metrics.
//!
//! This crate runs a [`BatchSource`] (normally a `CorosyncCollector`) on a
//! fixed interval and hands every successful batch to one or more outputs:
//! a JSON file, a TCP socket, an in-process channel, a Prometheus scrape
//! endpoint or an OpenTelemetry collector.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corowatch_collector::CorosyncCollector;
//! use corowatch_sdk::{Output, Scheduler};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector = CorosyncCollector::builder().use_sudo(false).build()?;
//!
//!     let scheduler = Scheduler::builder(collector)
//!         .output(Output::file("corosync.json"))
//!         .interval(Duration::from_secs(10))
//!         .build();
//!
//!     // Start background collection (non-blocking)
//!     let handle = scheduler.start();
//!
//!     // ... your application runs ...
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `tokio` (default): background scheduling and the file, TCP and channel outputs
//! - `prometheus`: HTTP scrape endpoint in the Prometheus text format
//! - `otel`: OTLP export through OpenTelemetry

mod output;

#[cfg(feature = "tokio")]
mod scheduler;

#[cfg(feature = "otel")]
pub mod otel;

#[cfg(feature = "prometheus")]
pub mod prometheus;

pub use output::Output;

#[cfg(feature = "tokio")]
pub use scheduler::{BatchSource, EmissionHandle, Scheduler, SchedulerBuilder, DEFAULT_INTERVAL};

#[cfg(feature = "otel")]
pub use otel::{OtelConfig, OtelExporter};

#[cfg(feature = "prometheus")]
pub use prometheus::{format_prometheus, PrometheusConfig, PrometheusExporter};

// Re-export types for convenience
pub use corowatch_types::{FieldValue, Gauge, MetricBatch};
