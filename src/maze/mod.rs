//! Maze model: grid cells, directions, and the weighted adjacency structure
//! a match is played on.
//!
//! A maze is an undirected graph over grid cells. Edge weights are traversal
//! costs: cost 1 is a plain passage, anything higher is mud that immobilizes
//! the player after crossing. The maze is immutable for the duration of a
//! match.
//!
//! JSON object keys must be strings, so the adjacency map serializes through
//! an edge-list representation (`MazeRepr`) both on the wire and in maze
//! files.

pub mod source;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use source::{CheesePlacer, FileMazeSource, MazeSource, OpenGridSource, UniformPlacer};

/// A grid cell, addressed by column (`x`) and row (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// Creates a cell at the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// A player's per-turn decision.
///
/// `None` declines to move; the resolver also treats it as the result of any
/// malformed or missing answer. It maps to no target cell, so it can never
/// accidentally match a real neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Decision {
    /// The cell this decision aims at from `from`, or `Option::None` for
    /// [`Decision::None`].
    pub fn target(self, from: Cell) -> Option<Cell> {
        match self {
            Decision::Up => Some(Cell::new(from.x, from.y + 1)),
            Decision::Down => Some(Cell::new(from.x, from.y - 1)),
            Decision::Left => Some(Cell::new(from.x - 1, from.y)),
            Decision::Right => Some(Cell::new(from.x + 1, from.y)),
            Decision::None => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Up => write!(f, "up"),
            Decision::Down => write!(f, "down"),
            Decision::Left => write!(f, "left"),
            Decision::Right => write!(f, "right"),
            Decision::None => write!(f, "none"),
        }
    }
}

/// Errors raised while building or loading a maze.
#[derive(Debug, Error)]
pub enum MazeError {
    #[error("Maze file '{path}' could not be read: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Maze file '{path}' could not be parsed: {source}")]
    FileParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Edge {a}-{b} has cost {cost}, costs must be >= 1")]
    InvalidCost { a: Cell, b: Cell, cost: u32 },

    #[error("Maze dimensions {width}x{height} are invalid, both must be >= 1")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Undirected weighted adjacency over grid cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "MazeRepr", try_from = "MazeRepr")]
pub struct Maze {
    width: u32,
    height: u32,
    adjacency: HashMap<Cell, HashMap<Cell, u32>>,
}

impl Maze {
    /// Creates an empty maze with the given dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, MazeError> {
        if width == 0 || height == 0 {
            return Err(MazeError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            adjacency: HashMap::new(),
        })
    }

    /// Width of the grid in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the grid in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Inserts an undirected edge between `a` and `b` with the given cost.
    pub fn add_edge(&mut self, a: Cell, b: Cell, cost: u32) -> Result<(), MazeError> {
        if cost == 0 {
            return Err(MazeError::InvalidCost { a, b, cost });
        }
        self.adjacency.entry(a).or_default().insert(b, cost);
        self.adjacency.entry(b).or_default().insert(a, cost);
        Ok(())
    }

    /// Traversal cost from `from` to `to`, or `None` if they are not
    /// neighbors.
    pub fn cost(&self, from: Cell, to: Cell) -> Option<u32> {
        self.adjacency.get(&from).and_then(|n| n.get(&to)).copied()
    }

    /// Iterates over the neighbors of `cell` with their costs.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = (Cell, u32)> + '_ {
        self.adjacency
            .get(&cell)
            .into_iter()
            .flat_map(|n| n.iter().map(|(c, w)| (*c, *w)))
    }

    /// Total number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|n| n.len()).sum::<usize>() / 2
    }

    /// Loads a maze layout (maze plus cheese) from a JSON file.
    pub fn load_layout(path: &std::path::Path) -> Result<MazeLayout, MazeError> {
        let text = std::fs::read_to_string(path).map_err(|source| MazeError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| MazeError::FileParse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Edge-list form used for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MazeRepr {
    width: u32,
    height: u32,
    edges: Vec<(Cell, Cell, u32)>,
}

impl From<Maze> for MazeRepr {
    fn from(maze: Maze) -> Self {
        let mut edges: Vec<(Cell, Cell, u32)> = maze
            .adjacency
            .iter()
            .flat_map(|(a, n)| n.iter().map(|(b, w)| (*a, *b, *w)))
            .filter(|(a, b, _)| a < b)
            .collect();
        // Stable ordering keeps wire frames and maze files reproducible.
        edges.sort();
        Self {
            width: maze.width,
            height: maze.height,
            edges,
        }
    }
}

impl TryFrom<MazeRepr> for Maze {
    type Error = MazeError;

    fn try_from(repr: MazeRepr) -> Result<Self, Self::Error> {
        let mut maze = Maze::new(repr.width, repr.height)?;
        for (a, b, cost) in repr.edges {
            maze.add_edge(a, b, cost)?;
        }
        Ok(maze)
    }
}

/// A generated playing field: the maze plus the initial cheese cells.
///
/// Produced once per match by a [`MazeSource`]; the cheese list may be empty,
/// in which case placement falls to a [`CheesePlacer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeLayout {
    pub maze: Maze,
    pub cheese: Vec<Cell>,
}

impl MazeLayout {
    /// The two starting corners: Rat at the origin, Python opposite.
    pub fn start_cells(&self) -> (Cell, Cell) {
        (
            Cell::new(0, 0),
            Cell::new(self.maze.width() as i32 - 1, self.maze.height() as i32 - 1),
        )
    }
}
