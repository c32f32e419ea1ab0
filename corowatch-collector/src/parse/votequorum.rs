use std::sync::LazyLock;

use corowatch_types::VoteTally;
use regex::bytes::Regex;

use super::{number, text};
use crate::error::ParseError;

// The Quorum line may carry a trailing note such as "Activity blocked",
// and Flags may be empty.
static VOTEQUORUM_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"Expected votes:[ \t]+(?P<expected>\S+)[ \t]*\n",
        r"Highest expected:[ \t]+(?P<highest>\S+)[ \t]*\n",
        r"Total votes:[ \t]+(?P<total>\S+)[ \t]*\n",
        r"Quorum:[ \t]+(?P<quorum>\S+)[^\n]*\n",
        r"Flags:(?P<flags>[^\n]*)",
    ))
    .expect("votequorum block pattern is valid")
});

/// Extract the votequorum section of `corosync-quorumtool` output.
pub fn parse_vote_tally(output: &[u8]) -> Result<VoteTally, ParseError> {
    let caps = VOTEQUORUM_BLOCK
        .captures(output)
        .ok_or(ParseError::GrammarMismatch {
            block: "votequorum",
        })?;

    Ok(VoteTally {
        expected_votes: number("Expected votes", &caps["expected"])?,
        highest_expected: number("Highest expected", &caps["highest"])?,
        total_votes: number("Total votes", &caps["total"])?,
        quorum: number("Quorum", &caps["quorum"])?,
        flags: text(&caps["flags"])
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    })
}
