use std::sync::LazyLock;

use corowatch_types::{LinkCounts, RingLinkStatus};
use regex::bytes::Regex;
use tracing::warn;

use super::{number, text};

static LINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"LINK ID (?P<id>[0-9]+) (?P<proto>[0-9A-Za-z_]+)[ \t]*\n",
        r"[ \t]*addr[ \t]*=[ \t]*(?P<address>[^\n]*?)[ \t]*\n",
        r"[ \t]*status[ \t]*=[ \t]*(?P<status>\S+)",
    ))
    .expect("link block pattern is valid")
});

/// Extract every link block from `corosync-cfgtool -sb` output, in order.
///
/// No blocks at all is a valid result (for example a node with no
/// configured links). A block whose id does not fit in a `u64` is skipped.
pub fn parse_link_statuses(output: &[u8]) -> Vec<RingLinkStatus> {
    LINK_BLOCK
        .captures_iter(output)
        .filter_map(|caps| {
            let ring_id = match number::<u64>("LINK ID", &caps["id"]) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "skipping link block");
                    return None;
                }
            };
            let status = text(&caps["status"]);
            Some(RingLinkStatus {
                ring_id,
                protocol: text(&caps["proto"]),
                address: text(&caps["address"]),
                counts: count_links(&status),
                status,
            })
        })
        .collect()
}

/// Classify each character of a link status string.
///
/// `n` marks the local node and is not counted; characters outside the
/// known set are tallied as `undefined` rather than rejected.
pub fn count_links(status: &str) -> LinkCounts {
    let mut counts = LinkCounts::default();
    for c in status.chars() {
        match c {
            '3' => counts.active += 1,
            '2' => counts.connected += 1,
            '1' => counts.enabled += 1,
            '?' => counts.unknown += 1,
            'n' => {}
            _ => counts.undefined += 1,
        }
    }
    counts
}
