//! Lifecycle supervisor: escalating reclamation of worker processes.
//!
//! Entered once per match after a terminal condition. Escalation order:
//!
//! 1. Send the stop flag to every worker still alive (best effort).
//! 2. Close each worker's inbound channel. EOF unblocks any pending read,
//!    no matter how many reads the worker has queued.
//! 3. Grace period: poll liveness on a short fixed interval, letting
//!    cooperative workers exit on their own.
//! 4. Force-kill every survivor, and keep re-signaling on each poll cycle
//!    until every worker is reaped.
//!
//! [`Supervisor::reclaim`] never returns while any worker process remains
//! alive. That property, not any cooperation from agent code, is what keeps
//! the referee from hanging on a worker stuck inside a hostile strategy.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::sandbox::AgentLink;

/// Reclamation timing knobs.
#[derive(Debug, Clone)]
pub struct Supervisor {
    /// How long cooperative shutdown may take before force-killing.
    grace: Duration,
    /// Liveness poll interval during both phases.
    poll_interval: Duration,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(250),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// What reclamation had to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Workers that exited during the grace period.
    pub graceful: usize,
    /// Workers that had to be force-killed.
    pub killed: usize,
    /// Total liveness poll cycles across both phases.
    pub cycles: u32,
}

impl Supervisor {
    pub fn new(grace: Duration, poll_interval: Duration) -> Self {
        Self {
            grace,
            poll_interval,
        }
    }

    /// Tears down every worker and only returns once all are dead.
    pub async fn reclaim(&self, links: &mut [AgentLink]) -> ReclaimReport {
        let mut report = ReclaimReport::default();

        for link in links.iter_mut() {
            if link.is_alive() {
                link.send_control(true);
            }
        }
        for link in links.iter_mut() {
            link.close_input();
        }

        // Grace phase.
        let deadline = Instant::now() + self.grace;
        loop {
            if links.iter_mut().all(|l| !l.is_alive()) {
                report.graceful = links.len();
                debug!(cycles = report.cycles, "All workers exited cooperatively");
                return report;
            }
            if Instant::now() >= deadline {
                break;
            }
            report.cycles += 1;
            sleep(self.poll_interval).await;
        }

        // Kill phase. Repeat the signal every cycle until the processes are
        // actually reaped.
        let survivors: Vec<_> = links
            .iter_mut()
            .enumerate()
            .filter_map(|(i, l)| l.is_alive().then_some(i))
            .collect();
        report.graceful = links.len() - survivors.len();
        report.killed = survivors.len();
        for &i in &survivors {
            warn!(role = %links[i].role(), "Worker unresponsive, force-killing");
        }
        loop {
            let mut any_alive = false;
            for link in links.iter_mut() {
                if link.is_alive() {
                    any_alive = true;
                    link.force_kill();
                }
            }
            if !any_alive {
                break;
            }
            report.cycles += 1;
            sleep(self.poll_interval).await;
        }

        info!(
            graceful = report.graceful,
            killed = report.killed,
            cycles = report.cycles,
            "Workers reclaimed"
        );
        report
    }
}
