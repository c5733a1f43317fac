//! Match statistics and the program-level result.
//!
//! Each match yields a [`MatchSummary`]; an [`Aggregate`] sums summaries over
//! a series and divides by the match count to produce the averaged
//! [`SeriesResult`] printed once at process exit.

use serde::{Deserialize, Serialize};

use crate::config::Role;

/// Per-role counters for one match (or, inside an aggregate, their running
/// sum). Wins are fractional because a tie awards half a win to each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleTotals {
    pub wins: f64,
    pub score: f64,
    pub moves: f64,
    pub misses: f64,
    pub stuck_turns: f64,
}

impl RoleTotals {
    fn add(&mut self, other: &RoleTotals) {
        self.wins += other.wins;
        self.score += other.score;
        self.moves += other.moves;
        self.misses += other.misses;
        self.stuck_turns += other.stuck_turns;
    }

    fn divided_by(&self, n: f64) -> RoleTotals {
        RoleTotals {
            wins: self.wins / n,
            score: self.score / n,
            moves: self.moves / n,
            misses: self.misses / n,
            stuck_turns: self.stuck_turns / n,
        }
    }
}

/// Outcome counters of a single match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub turns: u32,
    pub rat: RoleTotals,
    pub python: RoleTotals,
}

impl MatchSummary {
    pub fn totals(&self, role: Role) -> &RoleTotals {
        match role {
            Role::Rat => &self.rat,
            Role::Python => &self.python,
        }
    }
}

/// Running sums over a series of matches.
#[derive(Debug, Default)]
pub struct Aggregate {
    matches: u32,
    rat: RoleTotals,
    python: RoleTotals,
}

impl Aggregate {
    /// Folds one match into the running sums.
    pub fn record(&mut self, summary: &MatchSummary) {
        self.matches += 1;
        self.rat.add(&summary.rat);
        self.python.add(&summary.python);
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    /// The per-match averages. Zero matches yields an all-zero result.
    pub fn averaged(&self) -> SeriesResult {
        let n = self.matches.max(1) as f64;
        SeriesResult {
            matches: self.matches,
            rat: self.rat.divided_by(n),
            python: self.python.divided_by(n),
        }
    }
}

/// Program-level result: per-role totals averaged over the series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesResult {
    pub matches: u32,
    pub rat: RoleTotals,
    pub python: RoleTotals,
}

impl std::fmt::Display for SeriesResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Result over {} match(es):", self.matches)?;
        writeln!(
            f,
            "  {:<8} {:>6} {:>8} {:>8} {:>8} {:>8}",
            "role", "wins", "score", "moves", "misses", "stuck"
        )?;
        for (role, totals) in [(Role::Rat, &self.rat), (Role::Python, &self.python)] {
            writeln!(
                f,
                "  {:<8} {:>6.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
                role, totals.wins, totals.score, totals.moves, totals.misses, totals.stuck_turns
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(rat_score: f64, rat_wins: f64, python_score: f64, python_wins: f64) -> MatchSummary {
        MatchSummary {
            turns: 10,
            rat: RoleTotals {
                wins: rat_wins,
                score: rat_score,
                moves: 8.0,
                misses: 2.0,
                stuck_turns: 0.0,
            },
            python: RoleTotals {
                wins: python_wins,
                score: python_score,
                moves: 5.0,
                misses: 5.0,
                stuck_turns: 1.0,
            },
        }
    }

    #[test]
    fn test_aggregate_averages_by_match_count() {
        let mut aggregate = Aggregate::default();
        aggregate.record(&summary(3.0, 1.0, 1.0, 0.0));
        aggregate.record(&summary(1.0, 0.0, 3.0, 1.0));

        let result = aggregate.averaged();
        assert_eq!(result.matches, 2);
        assert_eq!(result.rat.score, 2.0);
        assert_eq!(result.rat.wins, 0.5);
        assert_eq!(result.python.wins, 0.5);
        assert_eq!(result.python.misses, 5.0);
    }

    #[test]
    fn test_empty_aggregate_is_all_zero() {
        let result = Aggregate::default().averaged();
        assert_eq!(result.matches, 0);
        assert_eq!(result.rat, RoleTotals::default());
    }

    #[test]
    fn test_tie_splits_wins() {
        let mut aggregate = Aggregate::default();
        aggregate.record(&summary(2.0, 0.5, 2.0, 0.5));

        let result = aggregate.averaged();
        assert_eq!(result.rat.wins, 0.5);
        assert_eq!(result.python.wins, 0.5);
    }

    #[test]
    fn test_display_mentions_both_roles() {
        let mut aggregate = Aggregate::default();
        aggregate.record(&summary(3.0, 1.0, 1.0, 0.0));
        let text = aggregate.averaged().to_string();

        assert!(text.contains("rat"));
        assert!(text.contains("python"));
    }
}
