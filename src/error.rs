//! Top-level error type for running matches.
//!
//! Agent misbehavior is not an error: load failures become the fallback
//! agent, runtime faults become `Decision::None`, and process faults are the
//! supervisor's job. What remains here is the small set of conditions that
//! legitimately abort a match before or during setup.

use thiserror::Error;

use crate::config::Role;
use crate::maze::MazeError;
use crate::sandbox::SandboxError;

/// Errors that abort a match.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A worker never completed the startup handshake. The only
    /// agent-related fault that reaches the orchestrator's control flow.
    #[error("No handshake from the {role} worker, aborting the match")]
    Handshake { role: Role },

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Maze error: {0}")]
    Maze(#[from] MazeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
