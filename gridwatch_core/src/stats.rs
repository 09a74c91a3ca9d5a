//! Aggregator run statistics.

use crate::validation::Classification;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why the aggregator ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The configured number of rounds ran
    RoundLimit(u32),
    
    /// An external stop request (marker file or flag) was observed
    StopRequested,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::RoundLimit(n) => write!(f, "{} rounds reached", n),
            StopReason::StopRequested => write!(f, "stop request detected"),
        }
    }
}

/// Counters owned and mutated only by the aggregator loop.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    confirmed: u64,
    unconfirmed: u64,
    rounds: u32,
    started_at: Duration,
}

impl RunStatistics {
    /// Starts counting at logical time `started_at`.
    pub fn new(started_at: Duration) -> Self {
        Self {
            started_at,
            ..Self::default()
        }
    }
    
    pub fn record(&mut self, classification: &Classification) {
        if classification.is_confirmed() {
            self.confirmed += 1;
        } else {
            self.unconfirmed += 1;
        }
    }
    
    /// Marks one aggregator round as complete.
    pub fn complete_round(&mut self) {
        self.rounds += 1;
    }
    
    pub fn confirmed(&self) -> u64 {
        self.confirmed
    }
    
    pub fn unconfirmed(&self) -> u64 {
        self.unconfirmed
    }
    
    /// Reports classified so far.
    pub fn total(&self) -> u64 {
        self.confirmed + self.unconfirmed
    }
    
    pub fn rounds(&self) -> u32 {
        self.rounds
    }
    
    /// Freezes the counters into a summary at logical time `now`.
    pub fn finalize(&self, now: Duration, reason: StopReason) -> RunSummary {
        RunSummary {
            reason,
            rounds: self.rounds,
            elapsed_secs: now.saturating_sub(self.started_at).as_secs_f64(),
            confirmed: self.confirmed,
            unconfirmed: self.unconfirmed,
        }
    }
}

/// Final, emitted-once summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub reason: StopReason,
    pub rounds: u32,
    pub elapsed_secs: f64,
    pub confirmed: u64,
    pub unconfirmed: u64,
}

impl RunSummary {
    pub fn total_events(&self) -> u64 {
        self.confirmed + self.unconfirmed
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--------------------")?;
        writeln!(f, "Summary:")?;
        writeln!(f)?;
        writeln!(f, "Simulation time (seconds): {:.5}", self.elapsed_secs)?;
        writeln!(f, "Confirmed events: {}", self.confirmed)?;
        write!(f, "Unconfirmed events: {}", self.unconfirmed)
    }
}
