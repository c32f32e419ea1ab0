//! Parsers for the free-form text printed by the corosync tools.
//!
//! Each grammar is matched as one contiguous block with its lines in the
//! documented order, so output that merely contains the right labels
//! somewhere is rejected.

mod cfgtool;
mod quorum;
mod votequorum;

pub use cfgtool::{count_links, parse_link_statuses};
pub use quorum::parse_quorum_status;
pub use votequorum::parse_vote_tally;

use std::str::FromStr;

use crate::error::ParseError;

/// Decode a captured value as UTF-8 text, replacing invalid sequences.
fn text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse a captured value, naming `field` on failure.
fn number<T>(field: &'static str, raw: &[u8]) -> Result<T, ParseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = text(raw);
    match value.parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ParseError::Field {
            field,
            reason: e.to_string(),
            value,
        }),
    }
}
