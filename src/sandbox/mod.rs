//! Worker-process sandbox hosting one agent per match.
//!
//! Untrusted strategy code never runs inside the referee. Each agent gets a
//! worker process (this same binary re-executed through a hidden subcommand)
//! talking the turn protocol over its own stdin/stdout pair, with stderr
//! inherited as the diagnostic stream. Process isolation plus the
//! orchestrator-side deadline is the whole containment story: a worker that
//! hangs or dies simply stops producing decisions, and the supervisor reaps
//! it at match end.
//!
//! Two halves:
//! - [`handle::AgentLink`] is the orchestrator side: spawn, handshake, frame
//!   sending, deadline-aware decision collection, liveness and kill
//!   primitives.
//! - [`worker`] is the worker side: strategy resolution with fallback, the
//!   hello/init/turn frame loop, panic containment around agent code.

pub mod handle;
pub mod worker;

use std::time::Duration;

use thiserror::Error;

pub use handle::{AgentIdentity, AgentLink};
pub use worker::{run_worker, WorkerOptions};

use crate::config::Role;
use crate::protocol::ProtocolError;

/// Errors raised while standing up or talking to a worker process.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Failed to spawn worker for {role}: {source}")]
    Spawn {
        role: Role,
        source: std::io::Error,
    },

    #[error("Worker for {role} came up without piped stdio")]
    Stdio { role: Role },

    #[error("Protocol failure for {role}: {source}")]
    Protocol {
        role: Role,
        source: ProtocolError,
    },

    #[error("No handshake from {role} within {timeout:?}")]
    HandshakeTimeout { role: Role, timeout: Duration },
}
