//! Deterministic movement and scoring resolution.
//!
//! Pure functions over player state: no I/O, no clocks, no randomness. Given
//! the same maze, cheese set, and decision sequences, replaying a match
//! turn-by-turn reproduces the same positions and scores exactly.

use std::collections::HashSet;

use crate::maze::{Cell, Decision, Maze};
use crate::presenter::CheeseCue;

/// One player's mutable state, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub location: Cell,
    pub score: f64,
    /// Mud countdown. Loaded with the edge cost on a successful move and
    /// decremented at the top of every turn; the player may act while it is
    /// <= 0, which nets out to cost-1 turns of immobilization.
    pub stuck: i32,
    pub moves: u64,
    pub misses: u64,
    pub stuck_turns: u64,
}

impl PlayerState {
    pub fn new(location: Cell) -> Self {
        Self {
            location,
            score: 0.0,
            stuck: 0,
            moves: 0,
            misses: 0,
            stuck_turns: 0,
        }
    }

    /// Free to act this turn.
    pub fn eligible(&self) -> bool {
        self.stuck <= 0
    }
}

/// Applies one player's decision.
///
/// A move succeeds iff the decision maps to a direct maze neighbor; the
/// countdown then picks up the edge cost. A failed attempt while free to
/// move is a miss; while immobilized it is a silent no-op.
pub fn apply_move(maze: &Maze, state: &mut PlayerState, decision: Decision) {
    let target = decision.target(state.location);
    let cost = target.and_then(|t| maze.cost(state.location, t));
    match (target, cost) {
        (Some(target), Some(cost)) => {
            state.stuck = cost as i32;
            state.location = target;
            state.moves += 1;
        }
        _ => {
            if state.eligible() {
                state.misses += 1;
            }
        }
    }
}

/// Applies both decisions. Both are collected before either is applied, so
/// the moves are effectively simultaneous.
pub fn apply_moves(
    maze: &Maze,
    rat: &mut PlayerState,
    python: &mut PlayerState,
    rat_decision: Decision,
    python_decision: Decision,
) {
    apply_move(maze, rat, rat_decision);
    apply_move(maze, python, python_decision);
}

/// Collects cheese under the pre-move locations, Rat's check first.
///
/// The asymmetry is deliberate, inherited behavior: only Rat's check detects
/// a shared cell and splits the point; Python's check runs independently
/// against whatever cheese remains. Returns the cue events the turn earned.
pub fn resolve_cheese(
    cheese: &mut HashSet<Cell>,
    rat: &mut PlayerState,
    python: &mut PlayerState,
    rat_enabled: bool,
    python_enabled: bool,
) -> Vec<CheeseCue> {
    let mut cues = Vec::new();

    if cheese.contains(&rat.location) && rat.eligible() && rat_enabled {
        cheese.remove(&rat.location);
        if python.location == rat.location && python.eligible() && python_enabled {
            rat.score += 0.5;
            python.score += 0.5;
            cues.push(CheeseCue::Both);
        } else {
            rat.score += 1.0;
            if cheese.contains(&python.location) && python.eligible() && python_enabled {
                cues.push(CheeseCue::Both);
            } else {
                cues.push(CheeseCue::Left);
            }
        }
    }
    if cheese.contains(&python.location) && python.eligible() && python_enabled {
        cheese.remove(&python.location);
        python.score += 1.0;
        cues.push(CheeseCue::Right);
    }

    cues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MazeConfig;
    use crate::maze::source::{MazeSource, OpenGridSource};

    fn open_maze(width: u32, height: u32) -> Maze {
        let config = MazeConfig {
            width,
            height,
            ..MazeConfig::default()
        };
        OpenGridSource.generate(&config).unwrap().maze
    }

    fn mud_maze() -> Maze {
        let mut maze = Maze::new(3, 1).unwrap();
        maze.add_edge(Cell::new(0, 0), Cell::new(1, 0), 4).unwrap();
        maze.add_edge(Cell::new(1, 0), Cell::new(2, 0), 1).unwrap();
        maze
    }

    #[test]
    fn test_valid_move_updates_location_and_count() {
        let maze = open_maze(3, 3);
        let mut player = PlayerState::new(Cell::new(1, 1));

        apply_move(&maze, &mut player, Decision::Up);

        assert_eq!(player.location, Cell::new(1, 2));
        assert_eq!(player.moves, 1);
        assert_eq!(player.misses, 0);
        assert_eq!(player.stuck, 1);
    }

    #[test]
    fn test_mud_immobilizes_for_cost_minus_one_turns() {
        let maze = mud_maze();
        let mut player = PlayerState::new(Cell::new(0, 0));

        // Crossing the cost-4 edge.
        player.stuck -= 1;
        apply_move(&maze, &mut player, Decision::Right);
        assert_eq!(player.location, Cell::new(1, 0));
        assert_eq!(player.stuck, 4);

        // Exactly 3 turns pass before the player is eligible again.
        let mut blocked = 0;
        loop {
            player.stuck -= 1;
            if player.eligible() {
                break;
            }
            blocked += 1;
        }
        assert_eq!(blocked, 3);

        // And the next move through a plain passage works immediately.
        apply_move(&maze, &mut player, Decision::Right);
        assert_eq!(player.location, Cell::new(2, 0));
        assert_eq!(player.stuck, 1);
        player.stuck -= 1;
        assert!(player.eligible());
    }

    #[test]
    fn test_invalid_decision_is_a_miss() {
        let maze = open_maze(2, 2);
        let mut player = PlayerState::new(Cell::new(0, 0));

        // Off the grid.
        apply_move(&maze, &mut player, Decision::Down);
        assert_eq!(player.misses, 1);
        assert_eq!(player.location, Cell::new(0, 0));

        // Declined.
        apply_move(&maze, &mut player, Decision::None);
        assert_eq!(player.misses, 2);
        assert_eq!(player.moves, 0);
    }

    #[test]
    fn test_no_miss_while_immobilized() {
        let maze = open_maze(2, 2);
        let mut player = PlayerState::new(Cell::new(0, 0));
        player.stuck = 2;

        apply_move(&maze, &mut player, Decision::None);

        assert_eq!(player.misses, 0);
        assert_eq!(player.location, Cell::new(0, 0));
    }

    #[test]
    fn test_split_score_awards_exactly_one_point() {
        let cell = Cell::new(1, 1);
        let mut cheese: HashSet<Cell> = [cell].into();
        let mut rat = PlayerState::new(cell);
        let mut python = PlayerState::new(cell);

        let cues = resolve_cheese(&mut cheese, &mut rat, &mut python, true, true);

        assert_eq!(rat.score, 0.5);
        assert_eq!(python.score, 0.5);
        assert_eq!(rat.score + python.score, 1.0);
        assert!(cheese.is_empty());
        assert_eq!(cues, vec![CheeseCue::Both]);
    }

    #[test]
    fn test_shared_cell_with_stuck_python_is_rat_point() {
        let cell = Cell::new(1, 1);
        let mut cheese: HashSet<Cell> = [cell].into();
        let mut rat = PlayerState::new(cell);
        let mut python = PlayerState::new(cell);
        python.stuck = 3;

        let cues = resolve_cheese(&mut cheese, &mut rat, &mut python, true, true);

        assert_eq!(rat.score, 1.0);
        assert_eq!(python.score, 0.0);
        assert_eq!(cues, vec![CheeseCue::Left]);
    }

    #[test]
    fn test_simultaneous_distinct_pickups() {
        let rat_cell = Cell::new(0, 0);
        let python_cell = Cell::new(2, 2);
        let mut cheese: HashSet<Cell> = [rat_cell, python_cell].into();
        let mut rat = PlayerState::new(rat_cell);
        let mut python = PlayerState::new(python_cell);

        let cues = resolve_cheese(&mut cheese, &mut rat, &mut python, true, true);

        assert_eq!(rat.score, 1.0);
        assert_eq!(python.score, 1.0);
        assert!(cheese.is_empty());
        // Rat's check sees Python's pending pickup and cues Both; Python's
        // own check still cues Right.
        assert_eq!(cues, vec![CheeseCue::Both, CheeseCue::Right]);
    }

    #[test]
    fn test_disabled_role_collects_nothing() {
        let cell = Cell::new(1, 0);
        let mut cheese: HashSet<Cell> = [cell].into();
        let mut rat = PlayerState::new(cell);
        let mut python = PlayerState::new(Cell::new(0, 0));

        let cues = resolve_cheese(&mut cheese, &mut rat, &mut python, false, true);

        assert_eq!(rat.score, 0.0);
        assert_eq!(cheese.len(), 1);
        assert!(cues.is_empty());
    }

    #[test]
    fn test_python_check_runs_after_rat_mutation() {
        // Both on the same cell, python also eligible: rat's branch removes
        // the cheese and splits, python's independent check finds nothing
        // left to award on top.
        let cell = Cell::new(2, 1);
        let mut cheese: HashSet<Cell> = [cell].into();
        let mut rat = PlayerState::new(cell);
        let mut python = PlayerState::new(cell);

        resolve_cheese(&mut cheese, &mut rat, &mut python, true, true);

        assert_eq!(rat.score + python.score, 1.0);
    }

    #[test]
    fn test_turn_sequence_is_reproducible() {
        let maze = open_maze(5, 5);
        let cheese_cells = [Cell::new(2, 0), Cell::new(4, 4), Cell::new(0, 3)];
        let script: &[(Decision, Decision)] = &[
            (Decision::Right, Decision::Left),
            (Decision::Right, Decision::Down),
            (Decision::Up, Decision::Down),
            (Decision::None, Decision::Left),
            (Decision::Down, Decision::Left),
        ];

        let run = || {
            let mut cheese: HashSet<Cell> = cheese_cells.into();
            let mut rat = PlayerState::new(Cell::new(0, 0));
            let mut python = PlayerState::new(Cell::new(4, 4));
            for &(d1, d2) in script {
                rat.stuck -= 1;
                python.stuck -= 1;
                resolve_cheese(&mut cheese, &mut rat, &mut python, true, true);
                apply_moves(&maze, &mut rat, &mut python, d1, d2);
            }
            let mut remaining: Vec<Cell> = cheese.into_iter().collect();
            remaining.sort();
            (rat, python, remaining)
        };

        assert_eq!(run(), run());
    }
}
