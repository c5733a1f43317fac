//! CLI command definitions and dispatch.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::RngExt;
use tracing::info;

use crate::config::{MatchConfig, MazeConfig, Role, TimingConfig, TimingMode};
use crate::engine;
use crate::maze::source;
use crate::sandbox::{run_worker, WorkerOptions};
use crate::stats::Aggregate;

/// Referee AI maze duels between a Rat and a Python.
#[derive(Parser)]
#[command(name = "ratrace")]
#[command(about = "Referee AI maze duels between a Rat and a Python")]
#[command(version)]
#[command(
    long_about = "ratrace runs turn-based maze matches between two strategy agents, each \
hosted in its own worker process with a bounded thinking budget.\n\nExample usage:\n  \
ratrace play --rat greedy --python dummy --width 15 --height 11 --pieces 21"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Play one or more matches between two strategies.
    Play(PlayArgs),

    /// Run as a sandbox worker process (spawned by the referee, not for
    /// direct use).
    #[command(name = "agent-worker", hide = true)]
    AgentWorker(WorkerArgs),
}

/// Arguments for `ratrace play`.
#[derive(Parser, Debug)]
pub struct PlayArgs {
    /// Strategy controlling the Rat; omit to disable the role.
    #[arg(long)]
    pub rat: Option<String>,

    /// Strategy controlling the Python; omit to disable the role.
    #[arg(long)]
    pub python: Option<String>,

    /// Maze width in cells.
    #[arg(short = 'x', long, default_value = "21")]
    pub width: u32,

    /// Maze height in cells.
    #[arg(short = 'y', long, default_value = "15")]
    pub height: u32,

    /// Number of cheese pieces.
    #[arg(short = 'p', long, default_value = "41")]
    pub pieces: usize,

    /// Wall density hint for the maze source.
    #[arg(long, default_value = "0.7")]
    pub density: f64,

    /// Allow a maze that is not fully connected.
    #[arg(long)]
    pub nonconnected: bool,

    /// Drop the central symmetry of maze and cheese.
    #[arg(long)]
    pub nonsymmetric: bool,

    /// Fraction of passages carrying mud.
    #[arg(long, default_value = "0.1")]
    pub mud_density: f64,

    /// Maximum mud cost.
    #[arg(long, default_value = "10")]
    pub mud_range: u32,

    /// Load the layout from a JSON maze file instead of generating one.
    #[arg(long)]
    pub maze_file: Option<PathBuf>,

    /// Per-turn thinking budget in milliseconds.
    #[arg(long, default_value = "100")]
    pub turn_time: u64,

    /// Preprocessing budget in milliseconds.
    #[arg(long, default_value = "3000")]
    pub preparation_time: u64,

    /// Turn ceiling guarding against unending games.
    #[arg(long, default_value = "2000")]
    pub max_turns: u32,

    /// Number of matches to play back to back.
    #[arg(long, default_value = "1")]
    pub tests: u32,

    /// Wait for every decision instead of enforcing the turn deadline.
    /// A hung agent will stall the match in this mode.
    #[arg(long)]
    pub synchronous: bool,

    /// Seed for reproducible cheese placement.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl PlayArgs {
    fn to_config(&self) -> MatchConfig {
        MatchConfig {
            maze: MazeConfig {
                width: self.width,
                height: self.height,
                density: self.density,
                connected: !self.nonconnected,
                symmetric: !self.nonsymmetric,
                mud_density: self.mud_density,
                mud_range: self.mud_range,
                maze_file: self.maze_file.clone(),
                cheese_count: self.pieces,
            },
            rat: self.rat.clone(),
            python: self.python.clone(),
            timing: TimingConfig {
                mode: if self.synchronous {
                    TimingMode::Unbounded
                } else {
                    TimingMode::Bounded
                },
                turn_time: Duration::from_millis(self.turn_time),
                preparation_time: Duration::from_millis(self.preparation_time),
                ..TimingConfig::default()
            },
            max_turns: self.max_turns,
            matches: self.tests,
            seed: self.seed,
            ..MatchConfig::default()
        }
    }
}

/// Arguments for the hidden worker entry.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Seat this worker plays: "rat" or "python".
    #[arg(long)]
    pub role: String,

    /// Strategy name to load; empty or absent loads the fallback.
    #[arg(long)]
    pub strategy: Option<String>,
}

/// Parses the command line.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Dispatches a parsed command line.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Play(args) => play(args.to_config()).await,
        Commands::AgentWorker(args) => {
            let role: Role = args.role.parse().map_err(anyhow::Error::msg)?;
            run_worker(WorkerOptions {
                role,
                strategy: args.strategy,
            })
            .await
        }
    }
}

/// Runs the configured series of matches and prints the averaged result.
async fn play(config: MatchConfig) -> anyhow::Result<()> {
    let mut aggregate = Aggregate::default();
    let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());

    for i in 0..config.matches.max(1) {
        if i > 0 {
            info!("match {}/{}", i + 1, config.matches);
        }
        let layout = source::generate_layout(&config.maze, base_seed.wrapping_add(i as u64))?;
        let report = engine::run_match(&config, layout, None).await?;
        aggregate.record(&report.summary);
    }

    let result = aggregate.averaged();
    print!("{result}");
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
