//! Agent strategies.
//!
//! A strategy is the pluggable brain controlling one player. The referee
//! never trusts it: strategies run inside a worker process (see
//! `crate::sandbox`) and only their protocol conformance and timing matter
//! here. Decision quality is their own problem.
//!
//! Strategies are bound by name through [`resolve`], a reflection-free
//! registry. An unknown name substitutes the built-in [`Dummy`] fallback so
//! the rest of the system never special-cases a missing agent.

mod dummy;
mod greedy;
mod stall;

use std::time::Duration;

pub use dummy::Dummy;
pub use greedy::Greedy;
pub use stall::Stall;

use crate::maze::{Cell, Decision, Maze};

/// Everything an agent sees before the match starts.
pub struct PreprocessContext<'a> {
    pub maze: &'a Maze,
    pub own: Cell,
    pub opponent: Cell,
    pub cheese: &'a [Cell],
    /// Advisory budget; enforcement happens on the orchestrator side.
    pub preparation: Duration,
}

/// Everything an agent sees on its turn.
pub struct TurnContext<'a> {
    pub maze: &'a Maze,
    pub own: Cell,
    pub opponent: Cell,
    pub own_score: f64,
    pub opponent_score: f64,
    pub cheese: &'a [Cell],
    /// Advisory budget; enforcement happens on the orchestrator side.
    pub budget: Duration,
}

/// The fixed capability interface every agent implements.
pub trait Strategy: Send {
    /// Display name announced during the startup handshake.
    fn name(&self) -> &str;

    /// One-off preparation before the first turn. Default: no-op.
    fn preprocess(&mut self, ctx: &PreprocessContext<'_>) {
        let _ = ctx;
    }

    /// Picks a move for the current turn.
    fn decide(&mut self, ctx: &TurnContext<'_>) -> Decision;
}

/// Looks up a strategy by registered name.
pub fn resolve(name: &str) -> Option<Box<dyn Strategy>> {
    match name {
        "dummy" => Some(Box::new(Dummy::new())),
        "greedy" => Some(Box::new(Greedy::new())),
        "stall" => Some(Box::new(Stall::new())),
        _ => None,
    }
}

/// Resolves `name`, substituting the fallback on any failure.
///
/// Returns the strategy and whether real agent code was loaded (false means
/// the fallback stands in). An empty or absent name is a disabled role and
/// falls back silently; the caller decides whether a failed non-empty lookup
/// is worth a diagnostic.
pub fn resolve_or_fallback(name: Option<&str>) -> (Box<dyn Strategy>, bool) {
    match name {
        Some(n) if !n.is_empty() => match resolve(n) {
            Some(strategy) => (strategy, true),
            None => (Box::new(Dummy::new()), false),
        },
        _ => (Box::new(Dummy::new()), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_names() {
        for name in ["dummy", "greedy", "stall"] {
            assert!(resolve(name).is_some(), "{name} should resolve");
        }
    }

    #[test]
    fn test_unknown_name_falls_back() {
        assert!(resolve("does-not-exist").is_none());

        let (strategy, loaded) = resolve_or_fallback(Some("does-not-exist"));
        assert!(!loaded);
        assert_eq!(strategy.name(), "Dummy");
    }

    #[test]
    fn test_absent_name_falls_back_silently() {
        let (strategy, loaded) = resolve_or_fallback(None);
        assert!(!loaded);
        assert_eq!(strategy.name(), "Dummy");

        let (_, loaded) = resolve_or_fallback(Some(""));
        assert!(!loaded);
    }

    #[test]
    fn test_known_name_reports_loaded() {
        let (strategy, loaded) = resolve_or_fallback(Some("greedy"));
        assert!(loaded);
        assert_eq!(strategy.name(), "Greedy");
    }
}
