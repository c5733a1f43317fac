//! Match configuration.
//!
//! All tunables live in explicit structs threaded through the orchestrator;
//! there is no process-wide state. Presentation behavior is configuration data
//! handed to the presentation collaborator, not a global toggle.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The two seats at the table. Rat is the first role: it starts at the
/// origin corner and its cheese check runs first each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rat,
    Python,
}

impl Role {
    pub const BOTH: [Role; 2] = [Role::Rat, Role::Python];

    /// Stable index: Rat = 0, Python = 1.
    pub fn index(self) -> usize {
        match self {
            Role::Rat => 0,
            Role::Python => 1,
        }
    }

    pub fn opponent(self) -> Role {
        match self {
            Role::Rat => Role::Python,
            Role::Python => Role::Rat,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Rat => "rat",
            Role::Python => "python",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rat" => Ok(Role::Rat),
            "python" => Ok(Role::Python),
            other => Err(format!("unknown role '{other}', expected 'rat' or 'python'")),
        }
    }
}

/// Parameters handed to the maze source.
///
/// `density`, `connected`, `mud_density` and `mud_range` only matter to a
/// real procedural generator; the built-in stand-ins ignore them but they are
/// carried so an external source sees the full request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Wall density hint for procedural generation.
    pub density: f64,
    /// Whether the generated maze must be fully connected.
    pub connected: bool,
    /// Whether maze and cheese are centrally symmetric.
    pub symmetric: bool,
    /// Fraction of edges carrying mud.
    pub mud_density: f64,
    /// Maximum mud cost (inclusive); costs are drawn from 2..=mud_range.
    pub mud_range: u32,
    /// Pre-built layout to load instead of generating.
    pub maze_file: Option<PathBuf>,
    /// Number of cheese pieces to place when the source supplies none.
    pub cheese_count: usize,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            width: 21,
            height: 15,
            density: 0.7,
            connected: true,
            symmetric: true,
            mud_density: 0.1,
            mud_range: 10,
            maze_file: None,
            cheese_count: 41,
        }
    }
}

/// Deadline policy for the per-turn decision wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingMode {
    /// Sleep out the turn budget, then read without blocking; a missing
    /// decision becomes `Decision::None`.
    Bounded,
    /// Block until the decision arrives. A hung agent stalls the match, so
    /// this is only for manual play or strict correctness testing.
    Unbounded,
}

/// Deadlines and budgets for one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub mode: TimingMode,
    /// Per-turn thinking budget.
    pub turn_time: Duration,
    /// One-off preprocessing budget granted before the first turn.
    pub preparation_time: Duration,
    /// How long to wait for a worker's startup handshake before aborting.
    pub handshake_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            mode: TimingMode::Bounded,
            turn_time: Duration::from_millis(100),
            preparation_time: Duration::from_millis(3000),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Settings consumed by the presentation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Whether a renderer is attached at all.
    pub enabled: bool,
    /// Whether the renderer should play cheese cues audibly.
    pub sound: bool,
    /// Whether the renderer may close itself once the match ends.
    pub auto_exit: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sound: true,
            auto_exit: false,
        }
    }
}

/// Everything the referee needs to run a series of matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    pub maze: MazeConfig,
    /// Strategy name controlling the Rat, `None` for a disabled role.
    pub rat: Option<String>,
    /// Strategy name controlling the Python, `None` for a disabled role.
    pub python: Option<String>,
    pub timing: TimingConfig,
    /// Turn ceiling guarding against unending games.
    pub max_turns: u32,
    /// Number of matches to play back to back.
    pub matches: u32,
    /// Seed for reproducible cheese placement; random when absent.
    pub seed: Option<u64>,
    pub presentation: PresentationConfig,
    /// Worker executable override; defaults to the current executable.
    pub worker_exe: Option<PathBuf>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            maze: MazeConfig::default(),
            rat: None,
            python: None,
            timing: TimingConfig::default(),
            max_turns: 2000,
            matches: 1,
            seed: None,
            presentation: PresentationConfig::default(),
            worker_exe: None,
        }
    }
}

impl MatchConfig {
    /// The strategy name configured for a role, if any.
    pub fn strategy_for(&self, role: Role) -> Option<&str> {
        match role {
            Role::Rat => self.rat.as_deref(),
            Role::Python => self.python.as_deref(),
        }
    }

    /// Whether a role is actively playing (a non-empty strategy name was
    /// configured). Disabled roles still get a sandbox hosting the silent
    /// fallback, but they collect no cheese and cannot win.
    pub fn enabled(&self, role: Role) -> bool {
        self.strategy_for(role).is_some_and(|s| !s.is_empty())
    }

    /// Sets the strategy names for both roles.
    pub fn with_strategies(
        mut self,
        rat: Option<impl Into<String>>,
        python: Option<impl Into<String>>,
    ) -> Self {
        self.rat = rat.map(Into::into);
        self.python = python.map(Into::into);
        self
    }

    /// Sets the per-turn budget.
    pub fn with_turn_time(mut self, turn_time: Duration) -> Self {
        self.timing.turn_time = turn_time;
        self
    }

    /// Sets the preprocessing budget.
    pub fn with_preparation_time(mut self, preparation: Duration) -> Self {
        self.timing.preparation_time = preparation;
        self
    }

    /// Sets the deadline policy.
    pub fn with_mode(mut self, mode: TimingMode) -> Self {
        self.timing.mode = mode;
        self
    }

    /// Sets the turn ceiling.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sets the placement seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the worker executable.
    pub fn with_worker_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.worker_exe = Some(exe.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_index_and_opponent() {
        assert_eq!(Role::Rat.index(), 0);
        assert_eq!(Role::Python.index(), 1);
        assert_eq!(Role::Rat.opponent(), Role::Python);
        assert_eq!("python".parse::<Role>().unwrap(), Role::Python);
        assert!("cheese".parse::<Role>().is_err());
    }

    #[test]
    fn test_enabled_requires_non_empty_name() {
        let config = MatchConfig::default().with_strategies(Some("greedy"), Some(""));
        assert!(config.enabled(Role::Rat));
        assert!(!config.enabled(Role::Python));
        assert_eq!(config.strategy_for(Role::Rat), Some("greedy"));
    }

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.maze.width, 21);
        assert_eq!(config.maze.cheese_count, 41);
        assert_eq!(config.timing.mode, TimingMode::Bounded);
        assert_eq!(config.timing.turn_time, Duration::from_millis(100));
        assert_eq!(config.max_turns, 2000);
        assert_eq!(config.matches, 1);
        assert!(config.rat.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = MatchConfig::default()
            .with_strategies(Some("greedy"), None::<String>)
            .with_turn_time(Duration::from_millis(10))
            .with_mode(TimingMode::Unbounded)
            .with_max_turns(50)
            .with_seed(99);

        assert_eq!(config.rat.as_deref(), Some("greedy"));
        assert!(config.python.is_none());
        assert_eq!(config.timing.turn_time, Duration::from_millis(10));
        assert_eq!(config.timing.mode, TimingMode::Unbounded);
        assert_eq!(config.max_turns, 50);
        assert_eq!(config.seed, Some(99));
    }
}
