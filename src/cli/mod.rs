//! Command-line interface for ratrace.
//!
//! Provides the `play` command that runs a series of matches, and the hidden
//! `agent-worker` entry that turns this binary into a sandbox worker.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
