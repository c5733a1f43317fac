//! Worker-side loop: the code that runs inside an agent's sandbox process.
//!
//! The worker resolves its strategy (falling back to the built-in no-op on
//! any failure), announces its name, preprocesses once, then serves turns
//! until told to stop or its inbound channel ends. Agent code runs under
//! `catch_unwind`: a panicking strategy costs the agent its move, never the
//! process its protocol.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::{debug, error, warn};

use crate::config::Role;
use crate::maze::Decision;
use crate::protocol::{self, FromWorker, InitFrame, ToWorker, TurnFrame};
use crate::strategy::{self, PreprocessContext, Strategy, TurnContext};

/// What a worker process needs to know about itself.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub role: Role,
    /// Configured strategy name; absent or empty for a disabled role.
    pub strategy: Option<String>,
}

/// Entry point of the worker process. Returns once the orchestrator asks for
/// a stop, the inbound channel ends, or the outbound channel breaks.
pub async fn run_worker(options: WorkerOptions) -> anyhow::Result<()> {
    let (mut strategy, loaded) = strategy::resolve_or_fallback(options.strategy.as_deref());
    if !loaded {
        if let Some(name) = options.strategy.as_deref().filter(|n| !n.is_empty()) {
            error!(
                role = %options.role,
                strategy = name,
                "Error while loading player strategy, dummy player loaded instead"
            );
        }
    }

    let mut stdout = tokio::io::stdout();
    let hello = FromWorker::Hello {
        name: strategy.name().to_string(),
        fallback: !loaded,
    };
    if write_frame(&mut stdout, &hello).await.is_err() {
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // First phase: wait for the initial payload. A stop or a dead channel
    // before it arrives just means the match never started.
    let init = loop {
        match next_frame(&mut lines, options.role).await {
            Some(ToWorker::Init(init)) => break init,
            Some(ToWorker::Control { stop: true }) | None => return Ok(()),
            Some(ToWorker::Control { stop: false }) => continue,
            Some(frame) => {
                warn!(role = %options.role, kind = frame.kind(), "Frame before init, ignoring");
            }
        }
    };
    preprocess(strategy.as_mut(), &init, options.role);

    // Turn loop: control flag first, then state if we may move this turn.
    loop {
        match next_frame(&mut lines, options.role).await {
            Some(ToWorker::Control { stop: true }) | None => break,
            Some(ToWorker::Control { stop: false }) => continue,
            Some(ToWorker::Turn(turn)) => {
                let decision = decide(strategy.as_mut(), &init, &turn, options.role);
                let frame = FromWorker::Decision {
                    turn: turn.turn,
                    decision,
                };
                if write_frame(&mut stdout, &frame).await.is_err() {
                    break;
                }
            }
            Some(ToWorker::Init(_)) => {
                warn!(role = %options.role, "Duplicate init frame, ignoring");
            }
        }
    }

    debug!(role = %options.role, "Worker exiting");
    Ok(())
}

/// Runs the strategy's preprocessing, absorbing panics.
fn preprocess(strategy: &mut dyn Strategy, init: &InitFrame, role: Role) {
    let ctx = PreprocessContext {
        maze: &init.maze,
        own: init.own,
        opponent: init.opponent,
        cheese: &init.cheese,
        preparation: Duration::from_millis(init.preparation_ms),
    };
    if catch_unwind(AssertUnwindSafe(|| strategy.preprocess(&ctx))).is_err() {
        error!(role = %role, "Strategy panicked during preprocessing, continuing without it");
    }
}

/// Runs the strategy's per-turn decision, absorbing panics into
/// `Decision::None`.
fn decide(
    strategy: &mut dyn Strategy,
    init: &InitFrame,
    turn: &TurnFrame,
    role: Role,
) -> Decision {
    let ctx = TurnContext {
        maze: &init.maze,
        own: turn.own,
        opponent: turn.opponent,
        own_score: turn.own_score,
        opponent_score: turn.opponent_score,
        cheese: &turn.cheese,
        budget: Duration::from_millis(turn.turn_ms),
    };
    match catch_unwind(AssertUnwindSafe(|| strategy.decide(&ctx))) {
        Ok(decision) => decision,
        Err(_) => {
            error!(role = %role, turn = turn.turn, "Strategy panicked, declining to move");
            Decision::None
        }
    }
}

/// Reads the next inbound frame; `None` on EOF, I/O error, or a malformed
/// line, all reasons to exit rather than block forever.
async fn next_frame(
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    role: Role,
) -> Option<ToWorker> {
    match lines.next_line().await {
        Ok(Some(line)) => match protocol::decode::<ToWorker>(&line) {
            Ok(frame) => Some(frame),
            Err(error) => {
                warn!(role = %role, %error, "Malformed inbound frame, exiting");
                None
            }
        },
        Ok(None) => None,
        Err(error) => {
            debug!(role = %role, %error, "Inbound channel error, exiting");
            None
        }
    }
}

async fn write_frame(stdout: &mut Stdout, frame: &FromWorker) -> Result<(), ()> {
    let line = protocol::encode(frame).map_err(|_| ())?;
    stdout
        .write_all(line.as_bytes())
        .await
        .map_err(|_| ())?;
    stdout.flush().await.map_err(|_| ())
}
