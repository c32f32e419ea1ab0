//! Corosync collector: runs both diagnostic tools and assembles a snapshot.
//!
//! ## Metrics Collected
//!
//! - **`corosync_quorum`** (tag `node_id`): `is_quorate`, `total_nodes`,
//!   `ring_id`, `total_votes`, `expected_votes`, `highest_expected`, `quorum`
//! - **`corosync_rings`** (tag `ring_id`, one per link): `active`,
//!   `connected`, `enabled`, `unknown`, `undefined`, `total`
//!
//! ## Example
//!
//! ```rust,no_run
//! use corowatch_collector::CorosyncCollector;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector = CorosyncCollector::builder().use_sudo(false).build()?;
//!
//!     let batch = collector.collect().await?;
//!     for gauge in &batch.gauges {
//!         println!("{} {:?} {:?}", gauge.measurement, gauge.tags, gauge.fields);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use corowatch_types::{current_timestamp_ms, MetricBatch, NodeSnapshot};
use tracing::debug;

use crate::error::RunError;
use crate::parse::{parse_link_statuses, parse_quorum_status, parse_vote_tally};
use crate::runner::{self, COMMAND_TIMEOUT};
use crate::tools::{self, Invocation, Tool, SUDO_BINARY};
use crate::CollectError;

/// Measurement carrying quorum and vote fields.
pub const QUORUM_MEASUREMENT: &str = "corosync_quorum";

/// Measurement carrying per-link health counts.
pub const RINGS_MEASUREMENT: &str = "corosync_rings";

// Longest slice of tool output quoted in an execution error.
const OUTPUT_EXCERPT_LEN: usize = 256;

/// Collects quorum and link status from the local corosync daemon.
#[derive(Debug, Clone)]
pub struct CorosyncCollector {
    quorum_tool: Invocation,
    cfg_tool: Invocation,
    timeout: Duration,
}

impl CorosyncCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> CorosyncCollectorBuilder {
        CorosyncCollectorBuilder::default()
    }

    /// The command line used for `tool`.
    pub fn invocation(&self, tool: Tool) -> &Invocation {
        match tool {
            Tool::QuorumTool => &self.quorum_tool,
            Tool::CfgTool => &self.cfg_tool,
        }
    }

    /// Run one collection cycle and convert it to gauges.
    pub async fn collect(&self) -> Result<MetricBatch, CollectError> {
        let snapshot = self.collect_status().await?;
        Ok(snapshot_to_batch(&snapshot, current_timestamp_ms()))
    }

    /// Run one collection cycle and return the parsed snapshot.
    ///
    /// The tools run one after the other, each bounded by the command
    /// timeout. Any failure aborts the whole cycle.
    pub async fn collect_status(&self) -> Result<NodeSnapshot, CollectError> {
        let quorum_output = self.execute(Tool::QuorumTool).await?;
        let cfg_output = self.execute(Tool::CfgTool).await?;

        let snapshot = assemble(&quorum_output, &cfg_output)?;
        debug!(
            node_id = snapshot.quorum.node_id,
            quorate = snapshot.quorum.is_quorate,
            links = snapshot.links.len(),
            "collected corosync status"
        );
        Ok(snapshot)
    }

    async fn execute(&self, tool: Tool) -> Result<Vec<u8>, CollectError> {
        let invocation = self.invocation(tool);
        debug!(command = %invocation, "running");

        let output = runner::run(invocation.program(), invocation.args(), self.timeout)
            .await
            .map_err(|e| match e {
                RunError::Timeout(timeout) => CollectError::ProcessTimeout {
                    tool,
                    command: invocation.to_string(),
                    timeout,
                },
                other => CollectError::ProcessExecution {
                    tool,
                    command: invocation.to_string(),
                    reason: other.to_string(),
                },
            })?;

        if !output.success() {
            return Err(CollectError::ProcessExecution {
                tool,
                command: invocation.to_string(),
                reason: format!("{}: {}", output.status, excerpt(&output.text())),
            });
        }

        Ok(output.combined)
    }
}

/// Parse both tool outputs into a snapshot.
///
/// Quorum and votequorum sections are read from the same quorumtool
/// output; the link list comes from cfgtool and may be empty.
pub fn assemble(quorum_output: &[u8], cfg_output: &[u8]) -> Result<NodeSnapshot, CollectError> {
    let quorum = parse_quorum_status(quorum_output).map_err(|source| CollectError::Parse {
        tool: Tool::QuorumTool,
        section: "quorum",
        source,
    })?;
    let votes = parse_vote_tally(quorum_output).map_err(|source| CollectError::Parse {
        tool: Tool::QuorumTool,
        section: "votequorum",
        source,
    })?;
    let links = parse_link_statuses(cfg_output);

    Ok(NodeSnapshot::new(quorum, votes, links))
}

/// Convert a snapshot into one quorum gauge followed by one gauge per link.
pub fn snapshot_to_batch(snapshot: &NodeSnapshot, timestamp_ms: u64) -> MetricBatch {
    let quorum = &snapshot.quorum;
    let votes = &snapshot.votes;

    let mut builder = MetricBatch::builder()
        .timestamp_ms(timestamp_ms)
        .gauge(QUORUM_MEASUREMENT, |g| {
            g.tag("node_id", quorum.node_id.to_string())
                .field("is_quorate", quorum.is_quorate)
                .field("total_nodes", quorum.total_nodes)
                .field("ring_id", quorum.ring_id.as_str())
                .field("total_votes", votes.total_votes)
                .field("expected_votes", votes.expected_votes)
                .field("highest_expected", votes.highest_expected)
                .field("quorum", votes.quorum)
        });

    for link in &snapshot.links {
        let counts = link.counts;
        builder = builder.gauge(RINGS_MEASUREMENT, |g| {
            g.tag("ring_id", link.ring_id.to_string())
                .field("active", counts.active)
                .field("connected", counts.connected)
                .field("enabled", counts.enabled)
                .field("unknown", counts.unknown)
                .field("undefined", counts.undefined)
                .field("total", link.peer_total())
        });
    }

    builder.build()
}

fn excerpt(output: &str) -> String {
    let trimmed = output.trim();
    match trimmed.char_indices().nth(OUTPUT_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Builder for `CorosyncCollector`.
///
/// Privilege escalation through `sudo` is enabled unless turned off with
/// [`use_sudo(false)`](Self::use_sudo).
#[derive(Debug)]
pub struct CorosyncCollectorBuilder {
    use_sudo: bool,
    quorum_tool: Option<PathBuf>,
    cfg_tool: Option<PathBuf>,
    sudo: Option<PathBuf>,
    search_path: Option<OsString>,
}

impl Default for CorosyncCollectorBuilder {
    fn default() -> Self {
        Self {
            use_sudo: true,
            quorum_tool: None,
            cfg_tool: None,
            sudo: None,
            search_path: None,
        }
    }
}

impl CorosyncCollectorBuilder {
    /// Prefix both invocations with `sudo` (default: true).
    pub fn use_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Use an explicit path for `corosync-quorumtool` instead of searching.
    pub fn quorum_tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.quorum_tool = Some(path.into());
        self
    }

    /// Use an explicit path for `corosync-cfgtool` instead of searching.
    pub fn cfg_tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cfg_tool = Some(path.into());
        self
    }

    /// Use an explicit path for `sudo` instead of searching.
    pub fn sudo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sudo = Some(path.into());
        self
    }

    /// Search these directories (`PATH` syntax) instead of the process `PATH`.
    pub fn search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Resolve every executable and build the collector.
    ///
    /// Fails with `ToolNotFound` if any required executable is missing.
    pub fn build(self) -> Result<CorosyncCollector, CollectError> {
        let cfg_tool = self.resolve(self.cfg_tool.clone(), Tool::CfgTool.binary())?;
        let quorum_tool = self.resolve(self.quorum_tool.clone(), Tool::QuorumTool.binary())?;
        let sudo = if self.use_sudo {
            Some(self.resolve(self.sudo.clone(), SUDO_BINARY)?)
        } else {
            None
        };

        Ok(CorosyncCollector {
            quorum_tool: Invocation::new(Tool::QuorumTool, &quorum_tool, sudo.as_deref()),
            cfg_tool: Invocation::new(Tool::CfgTool, &cfg_tool, sudo.as_deref()),
            timeout: COMMAND_TIMEOUT,
        })
    }

    fn resolve(
        &self,
        explicit: Option<PathBuf>,
        binary: &'static str,
    ) -> Result<PathBuf, CollectError> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        let found = match &self.search_path {
            Some(search_path) => tools::find_in(binary, search_path),
            None => tools::find_in_path(binary),
        };
        found.ok_or(CollectError::ToolNotFound { binary })
    }
}
