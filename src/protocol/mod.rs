//! Turn protocol spoken between the orchestrator and each worker.
//!
//! Frames are serde-tagged JSON, one per line, over the worker's stdin and
//! stdout. Each agent owns its own channel pair, so the two agents' protocol
//! streams never interleave and neither can observe the other's timing.
//!
//! Sequencing per turn: the orchestrator writes a `Control` frame (the
//! continue/stop flag), then a `Turn` frame if the agent may move; the worker
//! answers with a `Decision` frame echoing the turn index. The echoed index
//! is what lets the orchestrator discard decisions that arrive after their
//! deadline instead of misreading them on a later turn.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::maze::{Cell, Decision, Maze};

/// Errors in frame encoding, decoding, or channel plumbing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Frame codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel closed before a frame arrived")]
    ChannelClosed,

    #[error("Unexpected frame: expected {expected}, got {got}")]
    UnexpectedFrame {
        expected: &'static str,
        got: &'static str,
    },
}

/// Initial payload delivered once, before the first turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitFrame {
    pub maze: Maze,
    /// The receiving agent's own starting cell.
    pub own: Cell,
    pub opponent: Cell,
    pub cheese: Vec<Cell>,
    /// Advisory preprocessing budget in milliseconds; not enforced worker-side.
    pub preparation_ms: u64,
}

/// Per-turn game state, sent only to agents eligible to move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnFrame {
    pub turn: u32,
    pub own: Cell,
    pub opponent: Cell,
    pub own_score: f64,
    pub opponent_score: f64,
    pub cheese: Vec<Cell>,
    /// Advisory thinking budget in milliseconds.
    pub turn_ms: u64,
}

/// Frames flowing orchestrator -> worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToWorker {
    Init(InitFrame),
    /// Continue/stop flag, sent once per turn ahead of any state. `stop:
    /// true` asks the worker to exit its loop.
    Control { stop: bool },
    Turn(TurnFrame),
}

impl ToWorker {
    pub fn kind(&self) -> &'static str {
        match self {
            ToWorker::Init(_) => "init",
            ToWorker::Control { .. } => "control",
            ToWorker::Turn(_) => "turn",
        }
    }
}

/// Frames flowing worker -> orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FromWorker {
    /// Startup handshake, sent exactly once before anything else.
    Hello {
        /// Display name resolved by the worker.
        name: String,
        /// True when the built-in fallback was substituted for missing
        /// strategy code.
        fallback: bool,
    },
    /// Answer to a `Turn` frame, echoing its turn index.
    Decision { turn: u32, decision: Decision },
}

impl FromWorker {
    pub fn kind(&self) -> &'static str {
        match self {
            FromWorker::Hello { .. } => "hello",
            FromWorker::Decision { .. } => "decision",
        }
    }
}

/// Encodes a frame as a single JSON line (newline included).
pub fn encode<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    Ok(line)
}

/// Decodes one JSON line into a frame.
pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}
