//! Match orchestration.
//!
//! This module owns the turn loop: it drives the protocol toward both
//! sandboxes, applies the resolver, tracks score and termination conditions,
//! and hands terminal matches to the supervisor. Agent faults never surface
//! here: a misbehaving worker just produces `Decision::None` until the
//! supervisor reaps it.

pub mod resolver;

use std::collections::HashSet;
use std::path::PathBuf;

use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{MatchConfig, Role, TimingMode};
use crate::error::MatchError;
use crate::maze::{Cell, Decision, MazeLayout};
use crate::presenter::{self, PlayerSnapshot, PresenterLink, TurnSnapshot};
use crate::protocol::{InitFrame, TurnFrame};
use crate::sandbox::{AgentIdentity, AgentLink, SandboxError};
use crate::stats::{MatchSummary, RoleTotals};
use crate::supervisor::{ReclaimReport, Supervisor};

use resolver::PlayerState;

/// Phases a match passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Init,
    Running,
    ShuttingDown,
    Done,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    WinRat,
    WinPython,
    Tie,
    /// The turn ceiling was reached.
    Timeout,
    /// The cheese ran out without a win condition firing.
    NoCheeseLeft,
    /// The presentation collaborator requested an early exit.
    Interrupted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::WinRat => write!(f, "win_rat"),
            Outcome::WinPython => write!(f, "win_python"),
            Outcome::Tie => write!(f, "tie"),
            Outcome::Timeout => write!(f, "timeout"),
            Outcome::NoCheeseLeft => write!(f, "no_cheese_left"),
            Outcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Everything a finished match reports back.
#[derive(Debug)]
pub struct MatchReport {
    pub outcome: Outcome,
    pub summary: MatchSummary,
    pub identities: Vec<AgentIdentity>,
    pub reclaim: ReclaimReport,
}

/// Runs one complete match over the given layout: sandbox startup, handshake,
/// preprocessing, the turn loop, and supervised shutdown.
///
/// The layout is consumed; mazes are never reused across matches, and neither
/// are sandboxes.
pub async fn run_match(
    config: &MatchConfig,
    layout: MazeLayout,
    mut presenter: Option<PresenterLink>,
) -> Result<MatchReport, MatchError> {
    let match_id = Uuid::new_v4();
    let mut phase = MatchPhase::Init;
    debug!(match_id = %match_id, ?phase, "Match starting");

    let (rat_start, python_start) = layout.start_cells();
    let maze = layout.maze;
    let mut cheese: HashSet<Cell> = layout.cheese.iter().copied().collect();
    let total_cheese = cheese.len();

    let worker_exe = worker_executable(config)?;
    let mut links = Vec::with_capacity(2);
    for role in Role::BOTH {
        links.push(AgentLink::spawn(
            role,
            config.strategy_for(role),
            &worker_exe,
        )?);
    }

    // Handshake, bounded. Absence of a name is the one agent fault that
    // aborts the match, and even then both workers get reclaimed first.
    let mut identities = Vec::with_capacity(2);
    let mut handshake_failure = None;
    for i in 0..links.len() {
        match links[i].handshake(config.timing.handshake_timeout).await {
            Ok(identity) => {
                if !identity.exists {
                    debug!(match_id = %match_id, role = %identity.role, "Fallback agent answered the handshake");
                }
                identities.push(identity);
            }
            Err(error) => {
                handshake_failure = Some((links[i].role(), error));
                break;
            }
        }
    }
    if let Some((role, error)) = handshake_failure {
        Supervisor::default().reclaim(&mut links).await;
        return Err(match error {
            SandboxError::HandshakeTimeout { .. }
            | SandboxError::Protocol {
                source: crate::protocol::ProtocolError::ChannelClosed,
                ..
            } => MatchError::Handshake { role },
            other => MatchError::Sandbox(other),
        });
    }
    info!(
        match_id = %match_id,
        rat = %identities[0].name,
        python = %identities[1].name,
        cheese = total_cheese,
        "Match ready"
    );

    // Initial payloads, each agent seeing itself first.
    let preparation_ms = config.timing.preparation_time.as_millis() as u64;
    let cheese_list = sorted(&cheese);
    links[0].send_init(InitFrame {
        maze: maze.clone(),
        own: rat_start,
        opponent: python_start,
        cheese: cheese_list.clone(),
        preparation_ms,
    });
    links[1].send_init(InitFrame {
        maze: maze.clone(),
        own: python_start,
        opponent: rat_start,
        cheese: cheese_list,
        preparation_ms,
    });

    if config.timing.mode == TimingMode::Bounded {
        sleep(config.timing.preparation_time).await;
    }

    phase = MatchPhase::Running;
    debug!(match_id = %match_id, ?phase, "Turn loop entered");

    let enabled = [config.enabled(Role::Rat), config.enabled(Role::Python)];
    let mut players = [
        PlayerState::new(rat_start),
        PlayerState::new(python_start),
    ];
    let mut turns = 0u32;
    let turn_ms = config.timing.turn_time.as_millis() as u64;

    let outcome = loop {
        for link in links.iter_mut() {
            link.send_control(false);
        }

        if turns == config.max_turns {
            presenter::send_info(&presenter, "max number of turns reached!");
            break Outcome::Timeout;
        }
        turns += 1;

        for player in players.iter_mut() {
            player.stuck -= 1;
        }

        let [rat, python] = &mut players;
        let cues = resolver::resolve_cheese(&mut cheese, rat, python, enabled[0], enabled[1]);

        if let Some(link) = &presenter {
            link.publish(TurnSnapshot {
                turn: turns,
                cheese: sorted(&cheese),
                rat: snapshot_of(&players[0]),
                python: snapshot_of(&players[1]),
                cues,
            });
        }

        if let Some(outcome) = evaluate_win(total_cheese, &players, enabled, cheese.len()) {
            break outcome;
        }

        // Eligible agents get this turn's state; immobilized ones get
        // nothing and their forced `None` is accounted below.
        let cheese_list = sorted(&cheese);
        for (i, link) in links.iter_mut().enumerate() {
            if players[i].eligible() {
                link.send_turn(TurnFrame {
                    turn: turns,
                    own: players[i].location,
                    opponent: players[1 - i].location,
                    own_score: players[i].score,
                    opponent_score: players[1 - i].score,
                    cheese: cheese_list.clone(),
                    turn_ms,
                });
            }
        }

        let mut decisions = [Decision::None; 2];
        match config.timing.mode {
            TimingMode::Bounded => {
                sleep(config.timing.turn_time).await;
                for (i, link) in links.iter_mut().enumerate() {
                    if players[i].eligible() {
                        decisions[i] = link.try_decision(turns).unwrap_or(Decision::None);
                    } else {
                        players[i].stuck_turns += 1;
                    }
                }
            }
            TimingMode::Unbounded => {
                for (i, link) in links.iter_mut().enumerate() {
                    if players[i].eligible() {
                        decisions[i] = link.await_decision(turns).await.unwrap_or(Decision::None);
                    } else {
                        players[i].stuck_turns += 1;
                    }
                }
            }
        }

        if presenter
            .as_mut()
            .is_some_and(|link| link.stop_requested())
        {
            break Outcome::Interrupted;
        }

        let [rat, python] = &mut players;
        resolver::apply_moves(&maze, rat, python, decisions[0], decisions[1]);
    };

    phase = MatchPhase::ShuttingDown;
    debug!(match_id = %match_id, ?phase, %outcome, turns, "Match over, reclaiming workers");
    let reclaim = Supervisor::default().reclaim(&mut links).await;

    announce(&presenter, outcome, &identities, enabled);

    let (rat_wins, python_wins) = match outcome {
        Outcome::WinRat => (1.0, 0.0),
        Outcome::WinPython => (0.0, 1.0),
        Outcome::Tie => (0.5, 0.5),
        _ => (0.0, 0.0),
    };
    let summary = MatchSummary {
        turns,
        rat: totals_of(&players[0], rat_wins),
        python: totals_of(&players[1], python_wins),
    };

    phase = MatchPhase::Done;
    debug!(match_id = %match_id, ?phase, "Match done");
    Ok(MatchReport {
        outcome,
        summary,
        identities,
        reclaim,
    })
}

/// Win conditions, evaluated after cheese resolution each turn.
///
/// With both roles enabled, strictly more than half the original cheese wins
/// outright and exact halves on both sides tie; a lone enabled role has to
/// collect everything. Exhausted cheese without a winner ends the match too.
fn evaluate_win(
    total_cheese: usize,
    players: &[PlayerState; 2],
    enabled: [bool; 2],
    cheese_left: usize,
) -> Option<Outcome> {
    let total = total_cheese as f64;
    let half = total / 2.0;
    if enabled[0] && enabled[1] {
        if players[0].score == half && players[1].score == half {
            return Some(Outcome::Tie);
        }
        if players[0].score > half {
            return Some(Outcome::WinRat);
        }
        if players[1].score > half {
            return Some(Outcome::WinPython);
        }
    } else if enabled[0] {
        if players[0].score >= total {
            return Some(Outcome::WinRat);
        }
    } else if enabled[1] && players[1].score >= total {
        return Some(Outcome::WinPython);
    }
    if cheese_left == 0 {
        return Some(Outcome::NoCheeseLeft);
    }
    None
}

/// Sends the end-of-match text to the presenter or the diagnostic stream.
fn announce(
    presenter: &Option<PresenterLink>,
    outcome: Outcome,
    identities: &[AgentIdentity],
    enabled: [bool; 2],
) {
    let rat = &identities[0].name;
    let python = &identities[1].name;
    let both = enabled[0] && enabled[1];
    let text = match outcome {
        Outcome::WinRat if both => format!("The Rat ({rat}) won the match!"),
        Outcome::WinRat => format!("The Rat ({rat}) got all pieces of cheese!"),
        Outcome::WinPython if both => format!("The Python ({python}) won the match!"),
        Outcome::WinPython => format!("The Python ({python}) got all pieces of cheese!"),
        Outcome::Tie => format!(
            "The Rat ({rat}) and the Python ({python}) got the same number of pieces of cheese!"
        ),
        Outcome::NoCheeseLeft => "No more pieces of cheese!".to_string(),
        Outcome::Timeout => return,
        Outcome::Interrupted => "Match interrupted.".to_string(),
    };
    presenter::send_info(presenter, text);
}

fn worker_executable(config: &MatchConfig) -> Result<PathBuf, MatchError> {
    match &config.worker_exe {
        Some(path) => Ok(path.clone()),
        None => Ok(std::env::current_exe()?),
    }
}

fn sorted(cheese: &HashSet<Cell>) -> Vec<Cell> {
    let mut list: Vec<Cell> = cheese.iter().copied().collect();
    list.sort();
    list
}

fn snapshot_of(player: &PlayerState) -> PlayerSnapshot {
    PlayerSnapshot {
        location: player.location,
        score: player.score,
        moves: player.moves,
        misses: player.misses,
        stuck_turns: player.stuck_turns,
    }
}

fn totals_of(player: &PlayerState, wins: f64) -> RoleTotals {
    RoleTotals {
        wins,
        score: player.score,
        moves: player.moves as f64,
        misses: player.misses as f64,
        stuck_turns: player.stuck_turns as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(score: f64) -> PlayerState {
        let mut p = PlayerState::new(Cell::new(0, 0));
        p.score = score;
        p
    }

    #[test]
    fn test_majority_wins_outright() {
        let players = [player(2.5), player(1.5)];
        assert_eq!(
            evaluate_win(4, &players, [true, true], 0),
            Some(Outcome::WinRat)
        );

        let players = [player(1.0), player(3.0)];
        assert_eq!(
            evaluate_win(4, &players, [true, true], 0),
            Some(Outcome::WinPython)
        );
    }

    #[test]
    fn test_exact_half_alone_does_not_win() {
        // 2 of 4 with the opponent behind: the match goes on.
        let players = [player(2.0), player(1.0)];
        assert_eq!(evaluate_win(4, &players, [true, true], 1), None);
    }

    #[test]
    fn test_equal_halves_tie() {
        let players = [player(2.0), player(2.0)];
        assert_eq!(
            evaluate_win(4, &players, [true, true], 0),
            Some(Outcome::Tie)
        );

        // Halves can be fractional when splits happened.
        let players = [player(3.5), player(3.5)];
        assert_eq!(
            evaluate_win(7, &players, [true, true], 0),
            Some(Outcome::Tie)
        );
    }

    #[test]
    fn test_single_enabled_needs_full_count() {
        let players = [player(2.0), player(0.0)];
        assert_eq!(evaluate_win(3, &players, [true, false], 1), None);

        let players = [player(3.0), player(0.0)];
        assert_eq!(
            evaluate_win(3, &players, [true, false], 0),
            Some(Outcome::WinRat)
        );
    }

    #[test]
    fn test_empty_cheese_without_winner() {
        let players = [player(0.0), player(0.0)];
        assert_eq!(
            evaluate_win(3, &players, [false, false], 0),
            Some(Outcome::NoCheeseLeft)
        );
    }

    #[test]
    fn test_cheese_remaining_keeps_playing() {
        let players = [player(1.0), player(0.5)];
        assert_eq!(evaluate_win(4, &players, [true, true], 2), None);
    }
}
