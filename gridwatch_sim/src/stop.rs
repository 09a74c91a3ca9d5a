//! When the aggregator ends the run.

use gridwatch_core::{RoundLimit, StopReason};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default marker file, relative to the working directory.
pub const DEFAULT_SENTINEL: &str = "sentinel";

/// External stop request, polled once per aggregator round.
#[derive(Debug, Clone)]
pub enum StopSignal {
    /// Stop once this file exists
    MarkerFile(PathBuf),
    
    /// Stop once the flag is set
    Flag(Arc<AtomicBool>),
    
    /// No external request; only the round limit ends the run
    Never,
}

impl StopSignal {
    pub fn marker_file(path: impl Into<PathBuf>) -> Self {
        StopSignal::MarkerFile(path.into())
    }
    
    /// A flag signal together with the handle that trips it.
    pub fn flag() -> (Self, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (StopSignal::Flag(Arc::clone(&flag)), flag)
    }
    
    pub fn is_requested(&self) -> bool {
        match self {
            StopSignal::MarkerFile(path) => path.exists(),
            StopSignal::Flag(flag) => flag.load(Ordering::Acquire),
            StopSignal::Never => false,
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        StopSignal::marker_file(DEFAULT_SENTINEL)
    }
}

/// Round limit and external signal, evaluated together.
#[derive(Debug, Clone)]
pub struct StopCondition {
    pub limit: RoundLimit,
    pub signal: StopSignal,
}

impl StopCondition {
    pub fn new(limit: RoundLimit, signal: StopSignal) -> Self {
        Self { limit, signal }
    }
    
    /// Checked at the top of every aggregator round.
    pub fn evaluate(&self, completed_rounds: u32) -> Option<StopReason> {
        if self.limit.is_reached(completed_rounds) {
            return Some(StopReason::RoundLimit(completed_rounds));
        }
        if self.signal.is_requested() {
            return Some(StopReason::StopRequested);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_round_limit() {
        let stop = StopCondition::new(RoundLimit::Bounded(3), StopSignal::Never);
        assert_eq!(stop.evaluate(2), None);
        assert_eq!(stop.evaluate(3), Some(StopReason::RoundLimit(3)));
    }
    
    #[test]
    fn test_unbounded_never_stops_without_signal() {
        let stop = StopCondition::new(RoundLimit::Unbounded, StopSignal::Never);
        assert_eq!(stop.evaluate(u32::MAX), None);
    }
    
    #[test]
    fn test_flag_signal() {
        let (signal, handle) = StopSignal::flag();
        let stop = StopCondition::new(RoundLimit::Unbounded, signal);
        assert_eq!(stop.evaluate(0), None);
        
        handle.store(true, Ordering::Release);
        assert_eq!(stop.evaluate(1), Some(StopReason::StopRequested));
    }
    
    #[test]
    fn test_marker_file_signal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SENTINEL);
        let stop = StopCondition::new(RoundLimit::Bounded(100), StopSignal::marker_file(&path));
        assert_eq!(stop.evaluate(5), None);
        
        std::fs::write(&path, b"").unwrap();
        assert_eq!(stop.evaluate(5), Some(StopReason::StopRequested));
    }
    
    #[test]
    fn test_round_limit_takes_precedence() {
        let (signal, handle) = StopSignal::flag();
        handle.store(true, Ordering::Release);
        let stop = StopCondition::new(RoundLimit::Bounded(2), signal);
        assert_eq!(stop.evaluate(2), Some(StopReason::RoundLimit(2)));
    }
}
