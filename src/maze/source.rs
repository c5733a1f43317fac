//! Maze and cheese sourcing interfaces.
//!
//! Procedural generation is a collaborator, not part of the referee: the
//! engine only consumes a [`MazeLayout`]. This module defines the seams
//! ([`MazeSource`], [`CheesePlacer`]) and ships two minimal sources (a fully
//! connected open grid and a JSON maze file) plus a seeded uniform cheese
//! placer, enough to run complete matches without the external generator.

use std::collections::HashSet;
use std::path::PathBuf;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::config::MazeConfig;

use super::{Cell, Maze, MazeError, MazeLayout};

/// Produces the playing field for one match.
pub trait MazeSource {
    fn generate(&self, config: &MazeConfig) -> Result<MazeLayout, MazeError>;
}

/// Places cheese when the maze source supplied none.
pub trait CheesePlacer {
    /// Returns `count` distinct cells inside a `width` x `height` grid,
    /// avoiding both start cells. When `symmetric` is set, placements come in
    /// centrally mirrored pairs.
    fn place(
        &self,
        count: usize,
        width: u32,
        height: u32,
        symmetric: bool,
        starts: (Cell, Cell),
    ) -> Vec<Cell>;
}

/// Fully connected grid with unit costs everywhere and no cheese.
///
/// Stand-in for the external generator; ignores density and mud settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGridSource;

impl MazeSource for OpenGridSource {
    fn generate(&self, config: &MazeConfig) -> Result<MazeLayout, MazeError> {
        let mut maze = Maze::new(config.width, config.height)?;
        for x in 0..config.width as i32 {
            for y in 0..config.height as i32 {
                let cell = Cell::new(x, y);
                if x + 1 < config.width as i32 {
                    maze.add_edge(cell, Cell::new(x + 1, y), 1)?;
                }
                if y + 1 < config.height as i32 {
                    maze.add_edge(cell, Cell::new(x, y + 1), 1)?;
                }
            }
        }
        Ok(MazeLayout {
            maze,
            cheese: Vec::new(),
        })
    }
}

/// Loads a pre-built layout from a JSON maze file.
#[derive(Debug, Clone)]
pub struct FileMazeSource {
    path: PathBuf,
}

impl FileMazeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MazeSource for FileMazeSource {
    fn generate(&self, _config: &MazeConfig) -> Result<MazeLayout, MazeError> {
        Maze::load_layout(&self.path)
    }
}

/// Seeded uniform cheese placement.
#[derive(Debug, Clone, Copy)]
pub struct UniformPlacer {
    seed: u64,
}

impl UniformPlacer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl CheesePlacer for UniformPlacer {
    fn place(
        &self,
        count: usize,
        width: u32,
        height: u32,
        symmetric: bool,
        starts: (Cell, Cell),
    ) -> Vec<Cell> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mirror = |c: Cell| Cell::new(width as i32 - 1 - c.x, height as i32 - 1 - c.y);
        let mut placed: HashSet<Cell> = HashSet::new();

        // An odd symmetric count can only be satisfied with the self-mirrored
        // center cell.
        if symmetric && count % 2 == 1 {
            let center = Cell::new(width as i32 / 2, height as i32 / 2);
            if center != starts.0 && center != starts.1 {
                placed.insert(center);
            }
        }

        let mut attempts = 0u64;
        let budget = (width as u64 * height as u64 * 64).max(4096);
        while placed.len() < count && attempts < budget {
            attempts += 1;
            let cell = Cell::new(
                rng.random_range(0..width as i32),
                rng.random_range(0..height as i32),
            );
            if cell == starts.0 || cell == starts.1 || placed.contains(&cell) {
                continue;
            }
            if symmetric {
                let twin = mirror(cell);
                if twin == cell
                    || twin == starts.0
                    || twin == starts.1
                    || placed.contains(&twin)
                    || placed.len() + 2 > count
                {
                    continue;
                }
                placed.insert(cell);
                placed.insert(twin);
            } else {
                placed.insert(cell);
            }
        }

        if placed.len() < count {
            warn!(
                requested = count,
                placed = placed.len(),
                "Grid too crowded for requested cheese count"
            );
        }

        let mut cheese: Vec<Cell> = placed.into_iter().collect();
        cheese.sort();
        cheese
    }
}

/// Builds the layout for one match from the configuration: maze file if one
/// was given, the open grid otherwise, with cheese placement filling in when
/// the source produced none.
pub fn generate_layout(config: &MazeConfig, seed: u64) -> Result<MazeLayout, MazeError> {
    let mut layout = match &config.maze_file {
        Some(path) => FileMazeSource::new(path).generate(config)?,
        None => OpenGridSource.generate(config)?,
    };
    if layout.cheese.is_empty() {
        let starts = layout.start_cells();
        layout.cheese = UniformPlacer::new(seed).place(
            config.cheese_count,
            layout.maze.width(),
            layout.maze.height(),
            config.symmetric,
            starts,
        );
    }
    Ok(layout)
}
