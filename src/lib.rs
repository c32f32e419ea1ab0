//! # corowatch
//!
//! Periodically collects quorum and link health from a local corosync
//! daemon and exports it as metrics.
//!
//! The work is split across the workspace:
//!
//! - `corowatch-types`: parsed cluster status and the emitted gauge schema
//! - `corowatch-collector`: bounded tool execution and the output parsers
//! - `corowatch-sdk`: interval scheduling and the output backends
//!
//! This crate adds layered configuration ([`settings`]), duration parsing
//! ([`duration`]) and the wiring used by the `corowatch` binary ([`app`]).

pub mod app;
pub mod duration;
pub mod settings;

pub use app::Format;
pub use settings::Settings;
