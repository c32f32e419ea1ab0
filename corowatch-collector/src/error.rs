//! Error types for the collector.

use std::time::Duration;

use thiserror::Error;

use crate::Tool;

/// A tool's output did not have the expected layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The labeled block was not found anywhere in the output.
    #[error("{block} block not found in output")]
    GrammarMismatch { block: &'static str },

    /// A field was present but its value could not be converted.
    #[error("unable to parse {field} from {value:?}: {reason}")]
    Field {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl ParseError {
    /// Name of the field at fault, if the error is about a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ParseError::Field { field, .. } => Some(*field),
            ParseError::GrammarMismatch { .. } => None,
        }
    }
}

/// Failure of a single bounded process run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The process could not be started.
    #[error("failed to start process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Reading the process output or exit status failed.
    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    /// The process did not finish in time and its process group was killed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that abort a collection cycle.
///
/// None of these are retried; the next scheduled cycle starts from scratch.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A required executable could not be located.
    #[error("unable to locate {binary} in PATH")]
    ToolNotFound { binary: &'static str },

    /// An invocation exceeded its time bound.
    #[error("command {command:?} timed out after {timeout:?}")]
    ProcessTimeout {
        tool: Tool,
        command: String,
        timeout: Duration,
    },

    /// An invocation could not be started or exited unsuccessfully.
    #[error("command {command:?} failed: {reason}")]
    ProcessExecution {
        tool: Tool,
        command: String,
        reason: String,
    },

    /// A tool's output could not be parsed.
    #[error("unable to parse {tool} {section} output: {source}")]
    Parse {
        tool: Tool,
        section: &'static str,
        #[source]
        source: ParseError,
    },
}

impl CollectError {
    /// The tool involved, when the error came from running or parsing one.
    pub fn tool(&self) -> Option<Tool> {
        match self {
            CollectError::ToolNotFound { .. } => None,
            CollectError::ProcessTimeout { tool, .. }
            | CollectError::ProcessExecution { tool, .. }
            | CollectError::Parse { tool, .. } => Some(*tool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_messages_name_the_field() {
        let err = ParseError::Field {
            field: "Node ID",
            value: "abc".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unable to parse Node ID from \"abc\": invalid digit found in string"
        );
        assert_eq!(err.field(), Some("Node ID"));
    }

    #[test]
    fn collect_error_wraps_parse_error() {
        let err = CollectError::Parse {
            tool: Tool::QuorumTool,
            section: "quorum",
            source: ParseError::GrammarMismatch { block: "quorum" },
        };
        assert_eq!(
            err.to_string(),
            "unable to parse corosync-quorumtool quorum output: quorum block not found in output"
        );
        assert_eq!(err.tool(), Some(Tool::QuorumTool));
    }

    #[test]
    fn tool_not_found_has_no_tool() {
        let err = CollectError::ToolNotFound { binary: "sudo" };
        assert_eq!(err.to_string(), "unable to locate sudo in PATH");
        assert!(err.tool().is_none());
    }
}
