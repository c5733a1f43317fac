//! End-to-end matches against real worker processes.
//!
//! These tests exercise the full referee: spawned sandboxes, the handshake,
//! the turn protocol, deadline handling, and supervised shutdown. The worker
//! binary is the crate's own executable, located through Cargo.
//!
//! Tests that depend on agents actually moving run in unbounded mode so a
//! loaded machine cannot turn a slow-but-correct answer into a missed turn.

use std::path::PathBuf;
use std::time::Duration;

use ratrace::config::{MatchConfig, MazeConfig, Role, TimingMode};
use ratrace::engine::{run_match, Outcome};
use ratrace::error::MatchError;
use ratrace::maze::source::MazeSource;
use ratrace::maze::{Cell, MazeLayout, OpenGridSource};
use ratrace::presenter;

fn worker_exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ratrace"))
}

fn open_layout(width: u32, height: u32, cheese: Vec<Cell>) -> MazeLayout {
    let config = MazeConfig {
        width,
        height,
        ..MazeConfig::default()
    };
    let mut layout = OpenGridSource.generate(&config).unwrap();
    layout.cheese = cheese;
    layout
}

fn config(rat: Option<&str>, python: Option<&str>) -> MatchConfig {
    MatchConfig::default()
        .with_strategies(rat, python)
        .with_turn_time(Duration::from_millis(20))
        .with_preparation_time(Duration::ZERO)
        .with_worker_exe(worker_exe())
}

/// Guard against a hang being reported as a test timeout with no context.
async fn bounded<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(60), fut)
        .await
        .expect("match did not terminate in time")
}

#[tokio::test]
async fn test_dummy_duel_ends_at_turn_ceiling() {
    let layout = open_layout(
        5,
        5,
        vec![Cell::new(1, 3), Cell::new(2, 2), Cell::new(3, 1)],
    );
    let config = config(Some("dummy"), Some("dummy")).with_max_turns(10);

    let report = bounded(run_match(&config, layout, None)).await.unwrap();

    assert_eq!(report.outcome, Outcome::Timeout);
    assert_eq!(report.summary.turns, 10);
    assert_eq!(report.summary.rat.score, 0.0);
    assert_eq!(report.summary.python.score, 0.0);
    // No mud, so both agents were eligible every turn, and every declined
    // move is a miss.
    assert_eq!(report.summary.rat.misses, 10.0);
    assert_eq!(report.summary.python.misses, 10.0);
    assert_eq!(report.summary.rat.moves, 0.0);
    assert_eq!(
        report.reclaim.graceful + report.reclaim.killed,
        2,
        "both workers must be reclaimed"
    );
}

#[tokio::test]
async fn test_lone_agent_must_collect_full_count() {
    let layout = open_layout(3, 1, vec![Cell::new(1, 0), Cell::new(2, 0)]);
    let config = config(Some("greedy"), None)
        .with_mode(TimingMode::Unbounded)
        .with_max_turns(50);

    let report = bounded(run_match(&config, layout, None)).await.unwrap();

    assert_eq!(report.outcome, Outcome::WinRat);
    assert_eq!(report.summary.rat.score, 2.0);
    assert_eq!(report.summary.rat.wins, 1.0);
    assert_eq!(report.summary.python.wins, 0.0);
    assert_eq!(report.identities[0].name, "Greedy");
    assert!(report.identities[0].exists);
    // The disabled seat is the silent fallback.
    assert!(!report.identities[1].exists);
}

#[tokio::test]
async fn test_shared_last_cheese_splits_and_ties() {
    // Both greedy agents converge on the single center cheese and step onto
    // it in the same turn: half a point each, which ties the match.
    let layout = open_layout(3, 1, vec![Cell::new(1, 0)]);
    let config = config(Some("greedy"), Some("greedy"))
        .with_mode(TimingMode::Unbounded)
        .with_max_turns(10);

    let report = bounded(run_match(&config, layout, None)).await.unwrap();

    assert_eq!(report.outcome, Outcome::Tie);
    assert_eq!(report.summary.rat.score, 0.5);
    assert_eq!(report.summary.python.score, 0.5);
    assert_eq!(report.summary.rat.wins, 0.5);
    assert_eq!(report.summary.python.wins, 0.5);
}

#[tokio::test]
async fn test_majority_win_in_two_agent_game() {
    // Python is a dummy parked away from the cheese; greedy rat takes 2 of 2,
    // passing the strictly-more-than-half bar after the second pickup.
    let layout = open_layout(4, 1, vec![Cell::new(1, 0), Cell::new(2, 0)]);
    let config = config(Some("greedy"), Some("dummy"))
        .with_mode(TimingMode::Unbounded)
        .with_max_turns(20);

    let report = bounded(run_match(&config, layout, None)).await.unwrap();

    assert_eq!(report.outcome, Outcome::WinRat);
    assert_eq!(report.summary.rat.score, 2.0);
    assert_eq!(report.summary.rat.moves, 2.0);
}

#[tokio::test]
async fn test_stall_agent_is_contained_and_killed() {
    let layout = open_layout(5, 5, vec![Cell::new(2, 2)]);
    let config = config(Some("stall"), Some("dummy")).with_max_turns(3);

    let report = bounded(run_match(&config, layout, None)).await.unwrap();

    assert_eq!(report.outcome, Outcome::Timeout);
    // The staller never answered: every turn was a miss.
    assert_eq!(report.summary.rat.misses, 3.0);
    // A worker stuck inside agent code cannot exit cooperatively.
    assert!(report.reclaim.killed >= 1);
    assert_eq!(report.reclaim.graceful + report.reclaim.killed, 2);
}

#[tokio::test]
async fn test_unknown_strategy_plays_as_fallback() {
    let layout = open_layout(2, 1, vec![Cell::new(1, 0)]);
    let config = config(Some("no-such-brain"), None).with_max_turns(3);

    let report = bounded(run_match(&config, layout, None)).await.unwrap();

    // The role stays enabled, the fallback just never moves.
    assert_eq!(report.outcome, Outcome::Timeout);
    assert_eq!(report.identities[0].name, "Dummy");
    assert!(!report.identities[0].exists);
    assert_eq!(report.summary.rat.misses, 3.0);
}

#[tokio::test]
async fn test_missing_handshake_aborts_match() {
    let layout = open_layout(3, 3, vec![Cell::new(1, 1)]);
    // `cat` exits immediately on the unreadable operands without ever
    // speaking the protocol.
    let config = config(Some("dummy"), Some("dummy")).with_worker_exe("cat");

    let error = bounded(run_match(&config, layout, None)).await.unwrap_err();

    assert!(matches!(error, MatchError::Handshake { role: Role::Rat }));
}

#[tokio::test]
async fn test_presenter_can_interrupt() {
    let layout = open_layout(5, 5, vec![Cell::new(2, 2)]);
    let config = config(Some("dummy"), Some("dummy")).with_max_turns(1000);

    let (link, mut endpoint) = presenter::channel();
    endpoint.request_stop();

    let report = bounded(run_match(&config, layout, Some(link))).await.unwrap();

    assert_eq!(report.outcome, Outcome::Interrupted);
    assert_eq!(report.summary.turns, 1);
    let snapshot = endpoint.snapshots.recv().await.unwrap();
    assert_eq!(snapshot.turn, 1);
    assert_eq!(snapshot.cheese, vec![Cell::new(2, 2)]);
}

#[tokio::test]
async fn test_maze_file_layout_plays_through() {
    let layout = open_layout(2, 1, vec![Cell::new(1, 0)]);
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), serde_json::to_string(&layout).unwrap()).unwrap();

    let mut config = config(Some("greedy"), None)
        .with_mode(TimingMode::Unbounded)
        .with_max_turns(10);
    config.maze.maze_file = Some(file.path().to_path_buf());

    let loaded = ratrace::maze::source::generate_layout(&config.maze, 0).unwrap();
    assert_eq!(loaded.cheese, vec![Cell::new(1, 0)]);

    let report = bounded(run_match(&config, loaded, None)).await.unwrap();
    assert_eq!(report.outcome, Outcome::WinRat);
    assert_eq!(report.summary.rat.score, 1.0);
}

#[tokio::test]
async fn test_mud_immobilizes_between_pickups() {
    // Hand-built corridor: a cost-3 passage onto the first cheese. The lone
    // agent crosses it, sits out two turns, then finishes the corridor.
    let mut maze = ratrace::maze::Maze::new(3, 1).unwrap();
    maze.add_edge(Cell::new(0, 0), Cell::new(1, 0), 3).unwrap();
    maze.add_edge(Cell::new(1, 0), Cell::new(2, 0), 1).unwrap();
    let layout = MazeLayout {
        maze,
        cheese: vec![Cell::new(1, 0), Cell::new(2, 0)],
    };
    let config = config(Some("greedy"), None)
        .with_mode(TimingMode::Unbounded)
        .with_max_turns(20);

    let report = bounded(run_match(&config, layout, None)).await.unwrap();

    assert_eq!(report.outcome, Outcome::WinRat);
    assert_eq!(report.summary.rat.score, 2.0);
    // Two turns spent stuck in the mud after the first move.
    assert_eq!(report.summary.rat.stuck_turns, 2.0);
    assert_eq!(report.summary.rat.misses, 0.0);
}
