//! Orchestrator-side handle to one worker process.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Role;
use crate::maze::Decision;
use crate::protocol::{self, FromWorker, InitFrame, ProtocolError, ToWorker, TurnFrame};

use super::SandboxError;

/// Who is on the other end of a link.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub role: Role,
    /// Display name announced in the handshake.
    pub name: String,
    /// True when real strategy code was loaded, false when the fallback
    /// stands in.
    pub exists: bool,
}

/// Inbox of frames a worker has sent, with the turn-tagged decision
/// discipline: frames answering past turns are drained and discarded instead
/// of being misread as the current turn's answer.
struct DecisionInbox {
    role: Role,
    rx: mpsc::UnboundedReceiver<FromWorker>,
}

impl DecisionInbox {
    /// Non-blocking read of the decision for `turn`. Used in bounded mode
    /// after the turn budget has elapsed.
    fn try_decision(&mut self, turn: u32) -> Option<Decision> {
        loop {
            match self.rx.try_recv() {
                Ok(FromWorker::Decision { turn: t, decision }) if t == turn => {
                    return Some(decision)
                }
                Ok(FromWorker::Decision { turn: t, .. }) => {
                    debug!(role = %self.role, stale_turn = t, current_turn = turn, "Discarding stale decision");
                }
                Ok(frame) => {
                    warn!(role = %self.role, kind = frame.kind(), "Unexpected frame, ignoring");
                }
                Err(_) => return None,
            }
        }
    }

    /// Blocking read of the decision for `turn`. Used in unbounded mode; a
    /// closed channel (dead worker) yields `None` rather than hanging.
    async fn await_decision(&mut self, turn: u32) -> Option<Decision> {
        loop {
            match self.rx.recv().await {
                Some(FromWorker::Decision { turn: t, decision }) if t == turn => {
                    return Some(decision)
                }
                Some(FromWorker::Decision { turn: t, .. }) => {
                    debug!(role = %self.role, stale_turn = t, current_turn = turn, "Discarding stale decision");
                }
                Some(frame) => {
                    warn!(role = %self.role, kind = frame.kind(), "Unexpected frame, ignoring");
                }
                None => return None,
            }
        }
    }
}

/// One agent's sandbox, as seen by the orchestrator: the child process, an
/// unbounded outbox draining into its stdin, and the pumped inbox of its
/// stdout frames.
///
/// Sends never block the turn loop. A worker that stops reading just
/// accumulates frames in the outbox while the writer task waits on the pipe;
/// the worker is a supervisor problem by then, not a sender problem.
pub struct AgentLink {
    role: Role,
    child: Child,
    outbox: Option<mpsc::UnboundedSender<String>>,
    inbox: DecisionInbox,
    _reader: JoinHandle<()>,
    _writer: JoinHandle<()>,
    identity: Option<AgentIdentity>,
}

impl AgentLink {
    /// Spawns the worker process for `role` running the named strategy.
    ///
    /// stdin/stdout carry the protocol; stderr is inherited so agent
    /// diagnostics land on the referee's diagnostic stream.
    pub fn spawn(
        role: Role,
        strategy: Option<&str>,
        worker_exe: &Path,
    ) -> Result<Self, SandboxError> {
        let mut command = Command::new(worker_exe);
        command
            .arg("agent-worker")
            .arg("--role")
            .arg(role.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(name) = strategy {
            command.arg("--strategy").arg(name);
        }

        let mut child = command
            .spawn()
            .map_err(|source| SandboxError::Spawn { role, source })?;
        let stdin = child.stdin.take().ok_or(SandboxError::Stdio { role })?;
        let stdout = child.stdout.take().ok_or(SandboxError::Stdio { role })?;

        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(pump_frames(role, stdout, in_tx));
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(drain_outbox(role, stdin, out_rx));

        debug!(role = %role, pid = ?child.id(), "Worker spawned");
        Ok(Self {
            role,
            child,
            outbox: Some(out_tx),
            inbox: DecisionInbox { role, rx: in_rx },
            _reader: reader,
            _writer: writer,
            identity: None,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The identity captured by [`AgentLink::handshake`], once it ran.
    pub fn identity(&self) -> Option<&AgentIdentity> {
        self.identity.as_ref()
    }

    /// Waits for the worker's hello frame, at most `timeout`.
    pub async fn handshake(&mut self, timeout: Duration) -> Result<AgentIdentity, SandboxError> {
        match tokio::time::timeout(timeout, self.inbox.rx.recv()).await {
            Ok(Some(FromWorker::Hello { name, fallback })) => {
                let identity = AgentIdentity {
                    role: self.role,
                    name,
                    exists: !fallback,
                };
                self.identity = Some(identity.clone());
                Ok(identity)
            }
            Ok(Some(frame)) => Err(SandboxError::Protocol {
                role: self.role,
                source: ProtocolError::UnexpectedFrame {
                    expected: "hello",
                    got: frame.kind(),
                },
            }),
            Ok(None) => Err(SandboxError::Protocol {
                role: self.role,
                source: ProtocolError::ChannelClosed,
            }),
            Err(_) => Err(SandboxError::HandshakeTimeout {
                role: self.role,
                timeout,
            }),
        }
    }

    /// Queues a frame for the worker. Never blocks; failures are absorbed.
    /// A worker that stopped reading is a process fault, handled by
    /// deadlines and the supervisor, not by the sender.
    pub fn send(&mut self, frame: &ToWorker) {
        let Some(outbox) = self.outbox.as_ref() else {
            return;
        };
        match protocol::encode(frame) {
            Ok(line) => {
                if outbox.send(line).is_err() {
                    debug!(role = %self.role, kind = frame.kind(), "Worker stopped accepting frames");
                }
            }
            Err(error) => {
                warn!(role = %self.role, %error, "Failed to encode frame");
            }
        }
    }

    /// Sends the continue/stop flag for this turn.
    pub fn send_control(&mut self, stop: bool) {
        self.send(&ToWorker::Control { stop });
    }

    /// Sends the initial preprocessing payload.
    pub fn send_init(&mut self, init: InitFrame) {
        self.send(&ToWorker::Init(init));
    }

    /// Sends this turn's game state.
    pub fn send_turn(&mut self, turn: TurnFrame) {
        self.send(&ToWorker::Turn(turn));
    }

    /// Non-blocking decision read for bounded mode.
    pub fn try_decision(&mut self, turn: u32) -> Option<Decision> {
        self.inbox.try_decision(turn)
    }

    /// Blocking decision read for unbounded mode.
    pub async fn await_decision(&mut self, turn: u32) -> Option<Decision> {
        self.inbox.await_decision(turn).await
    }

    /// Closes the worker's inbound channel. Once the writer task drains the
    /// outbox it drops the pipe, and the resulting EOF is the explicit
    /// cancellation signal that unblocks any read the worker has pending.
    pub fn close_input(&mut self) {
        self.outbox.take();
    }

    /// Whether the worker process is still running. An unreadable status
    /// counts as dead so reclamation always terminates.
    pub fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => false,
            Err(error) => {
                warn!(role = %self.role, %error, "Could not poll worker status, assuming dead");
                false
            }
        }
    }

    /// Sends the unconditional kill signal. Safe to repeat.
    pub fn force_kill(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Drains queued frames into the worker's stdin; dropping the pipe on exit
/// delivers EOF. Ends when the outbox closes or the worker stops reading for
/// good (write error after a kill).
async fn drain_outbox(
    role: Role,
    mut stdin: ChildStdin,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = rx.recv().await {
        if let Err(error) = stdin.write_all(line.as_bytes()).await {
            debug!(role = %role, %error, "Worker stdin closed");
            return;
        }
        let _ = stdin.flush().await;
    }
}

/// Pumps stdout lines into the inbox until EOF or a malformed frame.
async fn pump_frames(
    role: Role,
    stdout: ChildStdout,
    tx: mpsc::UnboundedSender<FromWorker>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match protocol::decode::<FromWorker>(&line) {
                Ok(frame) => {
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    warn!(role = %role, %error, "Malformed frame from worker, closing inbox");
                    break;
                }
            },
            Ok(None) => break,
            Err(error) => {
                debug!(role = %role, %error, "Worker stdout closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbox_with(
        frames: Vec<FromWorker>,
    ) -> (DecisionInbox, mpsc::UnboundedSender<FromWorker>) {
        let (tx, rx) = mpsc::unbounded_channel();
        for frame in frames {
            tx.send(frame).unwrap();
        }
        (
            DecisionInbox {
                role: Role::Rat,
                rx,
            },
            tx,
        )
    }

    #[tokio::test]
    async fn test_try_decision_returns_current_turn() {
        let (mut inbox, _tx) = inbox_with(vec![FromWorker::Decision {
            turn: 3,
            decision: Decision::Up,
        }]);

        assert_eq!(inbox.try_decision(3), Some(Decision::Up));
        assert_eq!(inbox.try_decision(3), None);
    }

    #[tokio::test]
    async fn test_stale_decisions_are_discarded() {
        let (mut inbox, _tx) = inbox_with(vec![
            FromWorker::Decision {
                turn: 1,
                decision: Decision::Left,
            },
            FromWorker::Decision {
                turn: 2,
                decision: Decision::Right,
            },
        ]);

        // The late answer for turn 1 must not become turn 2's decision.
        assert_eq!(inbox.try_decision(2), Some(Decision::Right));
    }

    #[tokio::test]
    async fn test_missing_decision_is_none() {
        let (mut inbox, _tx) = inbox_with(vec![]);
        assert_eq!(inbox.try_decision(1), None);
    }

    #[tokio::test]
    async fn test_await_decision_on_closed_channel_is_none() {
        let (tx, rx) = mpsc::unbounded_channel::<FromWorker>();
        drop(tx);
        let mut inbox = DecisionInbox {
            role: Role::Python,
            rx,
        };

        assert_eq!(inbox.await_decision(1).await, None);
    }

    #[tokio::test]
    async fn test_non_decision_frames_are_skipped() {
        let (mut inbox, _tx) = inbox_with(vec![
            FromWorker::Hello {
                name: "late hello".into(),
                fallback: false,
            },
            FromWorker::Decision {
                turn: 5,
                decision: Decision::Down,
            },
        ]);

        assert_eq!(inbox.try_decision(5), Some(Decision::Down));
    }
}
