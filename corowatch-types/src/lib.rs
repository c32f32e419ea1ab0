//! # corowatch-types
//!
//! Core types for corosync cluster observability. This crate defines the
//! parsed status of a cluster node and the gauge schema that collectors emit
//! and outputs consume.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Named over positional**: Link health counts are a struct with one field per category
//! - **Versioned schema**: Batches include version info for forward compatibility
//! - **Ergonomic builders**: Fluent API for constructing batches
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use corowatch_types::{FieldValue, MetricBatch};
//!
//! let batch = MetricBatch::builder()
//!     .gauge("corosync_quorum", |g| {
//!         g.tag("node_id", "1")
//!             .field("is_quorate", true)
//!             .field("total_votes", 2u32)
//!     })
//!     .gauge("corosync_rings", |g| {
//!         g.tag("ring_id", "0").field("active", 1u32).field("total", 1u32)
//!     })
//!     .build();
//!
//! let quorum = batch.measurement("corosync_quorum").next().unwrap();
//! assert_eq!(quorum.field("is_quorate"), Some(&FieldValue::Bool(true)));
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! batches to allow consumers to handle format evolution gracefully.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod batch;
mod metrics;
mod status;
mod version;

pub use batch::*;
pub use metrics::*;
pub use status::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the batch format.
pub const SCHEMA_VERSION: u32 = 1;
