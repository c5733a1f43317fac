//! Protocol-abuse agent: accepts every turn and never answers.
//!
//! Exists to exercise the referee's containment path: deadline handling in
//! bounded mode and the supervisor's forced-kill escalation. Registered like
//! any other strategy so the integration suite can run it in a real worker.

use std::thread;
use std::time::Duration;

use crate::maze::Decision;

use super::{Strategy, TurnContext};

/// Blocks forever inside `decide`.
#[derive(Debug, Default)]
pub struct Stall;

impl Stall {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for Stall {
    fn name(&self) -> &str {
        "Stall"
    }

    fn decide(&mut self, _ctx: &TurnContext<'_>) -> Decision {
        loop {
            thread::sleep(Duration::from_secs(3600));
        }
    }
}
