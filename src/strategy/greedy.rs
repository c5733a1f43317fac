//! Sample agent: breadth-first search toward the nearest cheese.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::maze::{Cell, Decision, Maze};

use super::{Strategy, TurnContext};

/// Walks toward the closest cheese by hop count, ignoring mud costs.
#[derive(Debug, Default)]
pub struct Greedy;

impl Greedy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for Greedy {
    fn name(&self) -> &str {
        "Greedy"
    }

    fn decide(&mut self, ctx: &TurnContext<'_>) -> Decision {
        let targets: HashSet<Cell> = ctx.cheese.iter().copied().collect();
        if targets.is_empty() {
            return Decision::None;
        }
        match first_step_toward(ctx.maze, ctx.own, &targets) {
            Some(step) => direction_to(ctx.own, step),
            None => Decision::None,
        }
    }
}

/// BFS from `from`; returns the first cell on a shortest path to any target.
fn first_step_toward(maze: &Maze, from: Cell, targets: &HashSet<Cell>) -> Option<Cell> {
    if targets.contains(&from) {
        return None;
    }

    let mut parent: HashMap<Cell, Cell> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    parent.insert(from, from);

    while let Some(cell) = queue.pop_front() {
        // Sorted expansion keeps the walk deterministic across runs.
        let mut next: Vec<Cell> = maze.neighbors(cell).map(|(c, _)| c).collect();
        next.sort();
        for n in next {
            if parent.contains_key(&n) {
                continue;
            }
            parent.insert(n, cell);
            if targets.contains(&n) {
                let mut step = n;
                while parent[&step] != from {
                    step = parent[&step];
                }
                return Some(step);
            }
            queue.push_back(n);
        }
    }
    None
}

fn direction_to(from: Cell, to: Cell) -> Decision {
    if to.y == from.y + 1 {
        Decision::Up
    } else if to.y == from.y - 1 {
        Decision::Down
    } else if to.x == from.x - 1 {
        Decision::Left
    } else if to.x == from.x + 1 {
        Decision::Right
    } else {
        Decision::None
    }
}
