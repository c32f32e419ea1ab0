//! MetricBatch - the gauges emitted by one successful collection cycle.

use alloc::vec::Vec;

use crate::{Gauge, GaugeBuilder, SchemaVersion};

/// All metric points produced by one collection cycle.
///
/// A batch is emitted whole or not at all: collectors never hand out a
/// batch for a cycle that failed part way.
///
/// # Example
///
/// ```rust
/// use corowatch_types::MetricBatch;
///
/// let batch = MetricBatch::builder()
///     .timestamp_ms(1703160000000)
///     .gauge("corosync_quorum", |g| {
///         g.tag("node_id", "1").field("is_quorate", true).field("quorum", 2u32)
///     })
///     .gauge("corosync_rings", |g| g.tag("ring_id", "0").field("active", 1u32))
///     .build();
///
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct MetricBatch {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub version: SchemaVersion,

    /// Unix timestamp in milliseconds when the cycle completed.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub timestamp_ms: u64,

    /// Gauges in emission order.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub gauges: Vec<Gauge>,
}

impl MetricBatch {
    /// Create an empty batch with a specific timestamp.
    pub fn with_timestamp(timestamp_ms: u64) -> Self {
        Self {
            version: SchemaVersion::current(),
            timestamp_ms,
            gauges: Vec::new(),
        }
    }

    /// Create a builder for constructing batches.
    pub fn builder() -> MetricBatchBuilder {
        MetricBatchBuilder::new()
    }

    /// Check if the batch carries no gauges.
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// Number of gauges in the batch.
    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    /// Append a gauge.
    pub fn push(&mut self, gauge: Gauge) {
        self.gauges.push(gauge);
    }

    /// Iterate over gauges of one measurement.
    pub fn measurement<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Gauge> + 'a {
        self.gauges.iter().filter(move |g| g.measurement == name)
    }
}

/// Builder for constructing `MetricBatch` instances.
#[derive(Debug, Default)]
pub struct MetricBatchBuilder {
    timestamp_ms: Option<u64>,
    gauges: Vec<Gauge>,
}

impl MetricBatchBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add a gauge built using a closure.
    pub fn gauge<F>(mut self, measurement: &str, f: F) -> Self
    where
        F: FnOnce(GaugeBuilder) -> GaugeBuilder,
    {
        self.gauges.push(f(GaugeBuilder::new(measurement)).build());
        self
    }

    /// Add a pre-built gauge.
    pub fn push(mut self, gauge: Gauge) -> Self {
        self.gauges.push(gauge);
        self
    }

    /// Build the batch.
    #[cfg(feature = "std")]
    pub fn build(self) -> MetricBatch {
        MetricBatch {
            version: SchemaVersion::current(),
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            gauges: self.gauges,
        }
    }

    /// Build the batch with a specific timestamp (for no_std).
    #[cfg(not(feature = "std"))]
    pub fn build(self) -> MetricBatch {
        MetricBatch {
            version: SchemaVersion::current(),
            timestamp_ms: self.timestamp_ms.unwrap_or(0),
            gauges: self.gauges,
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
