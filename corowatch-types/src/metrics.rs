//! Gauge metric types - the shape of what a collector emits.

use alloc::collections::BTreeMap;
use alloc::string::String;

/// A single field value carried by a gauge.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum FieldValue {
    #[cfg_attr(feature = "minicbor", n(0))]
    Bool(#[cfg_attr(feature = "minicbor", n(0))] bool),

    #[cfg_attr(feature = "minicbor", n(1))]
    Unsigned(#[cfg_attr(feature = "minicbor", n(0))] u64),

    #[cfg_attr(feature = "minicbor", n(2))]
    Text(#[cfg_attr(feature = "minicbor", n(0))] String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    ///
    /// Booleans map to `1`/`0`; text has no numeric view.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Bool(b) => Some(u64::from(*b)),
            FieldValue::Unsigned(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    /// Text view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Unsigned(u64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Unsigned(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.into())
    }
}

/// One gauge-type metric point: a measurement name, identifying tags,
/// and the values observed at collection time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Gauge {
    /// Measurement name, e.g. `corosync_quorum`.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub measurement: String,

    /// Tags identifying the series (e.g. `node_id`, `ring_id`).
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(1))]
    pub tags: BTreeMap<String, String>,

    /// Observed values keyed by field name.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Gauge {
    /// Create an empty gauge for a measurement.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            ..Default::default()
        }
    }

    /// Create a builder for a gauge.
    pub fn builder(measurement: impl Into<String>) -> GaugeBuilder {
        GaugeBuilder::new(measurement)
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a tag value.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

/// Builder for `Gauge`.
#[derive(Debug, Default)]
pub struct GaugeBuilder {
    gauge: Gauge,
}

impl GaugeBuilder {
    /// Create a new builder for a measurement.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            gauge: Gauge::new(measurement),
        }
    }

    /// Add a tag.
    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.gauge.tags.insert(name.into(), value.into());
        self
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.gauge.fields.insert(name.into(), value.into());
        self
    }

    /// Build the gauge.
    pub fn build(self) -> Gauge {
        self.gauge
    }
}
