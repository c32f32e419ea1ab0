use std::sync::LazyLock;

use corowatch_types::QuorumStatus;
use regex::bytes::Regex;

use super::{number, text};
use crate::error::ParseError;

static QUORUM_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"Date:[ \t]+(?P<date>[^\n]*)\n",
        r"Quorum provider:[ \t]+(?P<provider>\S+)[ \t]*\n",
        r"Nodes:[ \t]+(?P<nodes>\S+)[ \t]*\n",
        r"Node ID:[ \t]+(?P<node_id>\S+)[ \t]*\n",
        r"Ring ID:[ \t]+(?P<ring_id>[0-9A-Za-z_.]+)[ \t]*\n",
        r"Quorate:[ \t]+(?P<quorate>\S+)",
    ))
    .expect("quorum block pattern is valid")
});

/// Extract the quorum section of `corosync-quorumtool` output.
///
/// `Quorate` must be exactly `Yes` or `No`; anything else is a field error
/// rather than a silent `false`.
pub fn parse_quorum_status(output: &[u8]) -> Result<QuorumStatus, ParseError> {
    let caps = QUORUM_BLOCK
        .captures(output)
        .ok_or(ParseError::GrammarMismatch { block: "quorum" })?;

    let total_nodes = number("Nodes", &caps["nodes"])?;
    let node_id = number("Node ID", &caps["node_id"])?;
    let ring_id = text(&caps["ring_id"]);
    let is_quorate = match &caps["quorate"] {
        b"Yes" => true,
        b"No" => false,
        other => {
            return Err(ParseError::Field {
                field: "Quorate",
                value: text(other),
                reason: "expected Yes or No".to_string(),
            })
        }
    };

    Ok(QuorumStatus {
        node_id,
        ring_id,
        is_quorate,
        total_nodes,
    })
}
