//! Parsed cluster status - what a single collection cycle learns about the node.

use alloc::string::String;
use alloc::vec::Vec;

/// Overall quorum state reported by `corosync-quorumtool`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct QuorumStatus {
    /// Id of the local node.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub node_id: u32,

    /// Current membership ring, e.g. `1.2f`.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub ring_id: String,

    /// Whether the partition this node belongs to holds quorum.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub is_quorate: bool,

    /// Number of nodes currently in the membership.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub total_nodes: u32,
}

/// Vote bookkeeping from the votequorum section of `corosync-quorumtool`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct VoteTally {
    #[cfg_attr(feature = "minicbor", n(0))]
    pub total_votes: u32,

    #[cfg_attr(feature = "minicbor", n(1))]
    pub expected_votes: u32,

    #[cfg_attr(feature = "minicbor", n(2))]
    pub highest_expected: u32,

    /// Votes required for the cluster to be quorate.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub quorum: u32,

    /// Status flags in the order corosync printed them (e.g. `Quorate`, `WaitForAll`).
    #[cfg_attr(feature = "minicbor", n(4))]
    pub flags: Vec<String>,
}

impl VoteTally {
    /// Check whether a flag is set. Flag names are case-sensitive.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Per-category count of peer states on one link.
///
/// The local node's own endpoint is never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct LinkCounts {
    /// Peers reported with `3`.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub active: u32,

    /// Peers reported with `2`.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub connected: u32,

    /// Peers reported with `1`.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub enabled: u32,

    /// Peers reported with `?`.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub unknown: u32,

    /// Peers reported with any other character.
    #[cfg_attr(feature = "minicbor", n(4))]
    pub undefined: u32,
}

impl LinkCounts {
    /// Sum over all five categories.
    pub fn counted(&self) -> u32 {
        self.active + self.connected + self.enabled + self.unknown + self.undefined
    }
}

/// Status of one communication link as reported by `corosync-cfgtool -sb`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct RingLinkStatus {
    #[cfg_attr(feature = "minicbor", n(0))]
    pub ring_id: u64,

    /// Transport protocol, e.g. `udp` or `knet`.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub protocol: String,

    #[cfg_attr(feature = "minicbor", n(2))]
    pub address: String,

    /// The raw per-peer status string, one character per node.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub status: String,

    #[cfg_attr(feature = "minicbor", n(4))]
    pub counts: LinkCounts,
}

impl RingLinkStatus {
    /// Number of peers on this link, excluding the local node.
    ///
    /// The status string carries one character per node including the
    /// local one, so this is its length minus one.
    pub fn peer_total(&self) -> u32 {
        (self.status.chars().count() as u32).saturating_sub(1)
    }
}

/// Everything gathered in one collection cycle.
///
/// A snapshot is only ever built from fully parsed parts; a cycle that
/// fails anywhere produces no snapshot at all.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct NodeSnapshot {
    #[cfg_attr(feature = "minicbor", n(0))]
    pub quorum: QuorumStatus,

    #[cfg_attr(feature = "minicbor", n(1))]
    pub votes: VoteTally,

    /// Links in the order `corosync-cfgtool` listed them.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub links: Vec<RingLinkStatus>,
}

impl NodeSnapshot {
    /// Assemble a snapshot from its parsed parts.
    pub fn new(quorum: QuorumStatus, votes: VoteTally, links: Vec<RingLinkStatus>) -> Self {
        Self {
            quorum,
            votes,
            links,
        }
    }

    /// Look up a link by its ring id.
    pub fn link(&self, ring_id: u64) -> Option<&RingLinkStatus> {
        self.links.iter().find(|l| l.ring_id == ring_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn link(status: &str) -> RingLinkStatus {
        RingLinkStatus {
            ring_id: 0,
            protocol: "udp".to_string(),
            address: "10.0.0.1".to_string(),
            status: status.to_string(),
            counts: LinkCounts::default(),
        }
    }

    #[test]
    fn peer_total_excludes_local_node() {
        assert_eq!(link("31?n2").peer_total(), 4);
        assert_eq!(link("n3").peer_total(), 1);
    }

    #[test]
    fn peer_total_single_node_is_zero() {
        assert_eq!(link("n").peer_total(), 0);
        assert_eq!(link("").peer_total(), 0);
    }

    #[test]
    fn counted_sums_categories() {
        let counts = LinkCounts {
            active: 2,
            connected: 1,
            enabled: 0,
            unknown: 1,
            undefined: 3,
        };
        assert_eq!(counts.counted(), 7);
    }

    #[test]
    fn has_flag_is_case_sensitive() {
        let votes = VoteTally {
            flags: vec!["Quorate".to_string(), "WaitForAll".to_string()],
            ..Default::default()
        };
        assert!(votes.has_flag("WaitForAll"));
        assert!(!votes.has_flag("quorate"));
    }

    #[test]
    fn snapshot_link_lookup() {
        let mut second = link("n3");
        second.ring_id = 1;
        let snapshot = NodeSnapshot::new(
            QuorumStatus {
                node_id: 1,
                ring_id: "1.2f".to_string(),
                is_quorate: true,
                total_nodes: 2,
            },
            VoteTally::default(),
            vec![link("n3"), second],
        );

        assert_eq!(snapshot.link(1).map(|l| l.ring_id), Some(1));
        assert!(snapshot.link(7).is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = NodeSnapshot::new(
            QuorumStatus {
                node_id: 3,
                ring_id: "3.5".to_string(),
                is_quorate: false,
                total_nodes: 1,
            },
            VoteTally {
                total_votes: 1,
                expected_votes: 3,
                highest_expected: 3,
                quorum: 2,
                flags: vec![],
            },
            vec![link("n")],
        );

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: NodeSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, parsed);
    }
}
