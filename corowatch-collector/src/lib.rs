//! # corowatch-collector
//!
//! Collects quorum and link health from a local corosync daemon by running
//! its diagnostic tools and parsing their human-readable output.
//!
//! Each cycle runs `corosync-quorumtool` and `corosync-cfgtool -sb`
//! (optionally through `sudo`), each bounded by a five second deadline, and
//! produces one `corosync_quorum` gauge plus one `corosync_rings` gauge per
//! configured link. A cycle either yields a complete batch or an error;
//! partial results are never emitted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corowatch_collector::CorosyncCollector;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector = CorosyncCollector::builder().build()?;
//!
//!     let snapshot = collector.collect_status().await?;
//!     println!(
//!         "node {} quorate={} links={}",
//!         snapshot.quorum.node_id,
//!         snapshot.quorum.is_quorate,
//!         snapshot.links.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! The parsers are exposed on their own for callers that already hold tool
//! output:
//!
//! ```rust
//! use corowatch_collector::parse::count_links;
//!
//! let counts = count_links("n33?");
//! assert_eq!(counts.active, 2);
//! assert_eq!(counts.unknown, 1);
//! ```

pub mod corosync;
pub mod error;
pub mod parse;
pub mod runner;
pub mod tools;

pub use corosync::{
    assemble, snapshot_to_batch, CorosyncCollector, CorosyncCollectorBuilder, QUORUM_MEASUREMENT,
    RINGS_MEASUREMENT,
};
pub use error::{CollectError, ParseError, RunError};
pub use runner::COMMAND_TIMEOUT;
pub use tools::{Invocation, Tool};

// Re-export types for convenience
pub use corowatch_types::{
    FieldValue, Gauge, LinkCounts, MetricBatch, NodeSnapshot, QuorumStatus, RingLinkStatus,
    VoteTally,
};
