//! Presentation link.
//!
//! Rendering and audio live outside the referee. What the engine offers is a
//! one-way stream of per-turn snapshots, a text channel for progress
//! messages, and a back channel through which the collaborator may request an
//! early exit (polled once per turn, never blocking). When no presenter is
//! attached, progress text goes straight to the diagnostic stream.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::maze::Cell;

/// Which cheese sound the turn earned, in source order.
///
/// `Left` is the Rat's pickup, `Right` the Python's, `Both` a shared or
/// simultaneous pickup. Data only; playback is the presenter's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheeseCue {
    Left,
    Right,
    Both,
}

/// One player's visible state inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub location: Cell,
    pub score: f64,
    pub moves: u64,
    pub misses: u64,
    pub stuck_turns: u64,
}

/// What a renderer needs to draw one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub turn: u32,
    pub cheese: Vec<Cell>,
    pub rat: PlayerSnapshot,
    pub python: PlayerSnapshot,
    pub cues: Vec<CheeseCue>,
}

/// Orchestrator-held end of the presentation channels.
pub struct PresenterLink {
    snapshots: mpsc::UnboundedSender<TurnSnapshot>,
    info: mpsc::UnboundedSender<String>,
    stop: mpsc::UnboundedReceiver<()>,
}

/// Collaborator-held end of the presentation channels.
pub struct PresenterEndpoint {
    pub snapshots: mpsc::UnboundedReceiver<TurnSnapshot>,
    pub info: mpsc::UnboundedReceiver<String>,
    stop: mpsc::UnboundedSender<()>,
}

/// Creates a connected link/endpoint pair.
pub fn channel() -> (PresenterLink, PresenterEndpoint) {
    let (snap_tx, snap_rx) = mpsc::unbounded_channel();
    let (info_tx, info_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = mpsc::unbounded_channel();
    (
        PresenterLink {
            snapshots: snap_tx,
            info: info_tx,
            stop: stop_rx,
        },
        PresenterEndpoint {
            snapshots: snap_rx,
            info: info_rx,
            stop: stop_tx,
        },
    )
}

impl PresenterLink {
    /// Publishes a turn snapshot. A vanished presenter is not an error.
    pub fn publish(&self, snapshot: TurnSnapshot) {
        let _ = self.snapshots.send(snapshot);
    }

    /// Sends progress text to the presenter.
    pub fn send_info(&self, text: impl Into<String>) {
        let _ = self.info.send(text.into());
    }

    /// Non-blocking check for an early-exit request.
    pub fn stop_requested(&mut self) -> bool {
        self.stop.try_recv().is_ok()
    }
}

impl PresenterEndpoint {
    /// Asks the orchestrator to end the match at the next turn boundary.
    pub fn request_stop(&self) {
        let _ = self.stop.send(());
    }
}

/// Routes progress text to the presenter when one is attached, to the
/// diagnostic stream otherwise.
pub fn send_info(link: &Option<PresenterLink>, text: impl Into<String>) {
    let text = text.into();
    match link {
        Some(link) => link.send_info(text),
        None => info!("{text}"),
    }
}
