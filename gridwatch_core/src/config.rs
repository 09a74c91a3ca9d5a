//! Detection and run-length configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable constants of the detection protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// A reading at or above this value is an anomaly candidate
    pub threshold: i32,
    
    /// Allowed absolute difference between corroborating readings
    pub reading_difference: i32,
    
    /// Allowed logical-time difference between a report and a reference sample (ms)
    pub time_tolerance_ms: u64,
    
    /// Readings are drawn from `0..=max_reading`
    pub max_reading: i32,
    
    /// Round cadence (ms); the reference feed refreshes every half interval
    pub interval_ms: u64,
    
    /// Corroborating neighbours required before a report is sent
    pub min_corroborators: usize,
    
    /// Number of slots in the reference ring
    pub feed_capacity: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 70,
            reading_difference: 20,
            time_tolerance_ms: 400,
            max_reading: 100,
            interval_ms: 1000,
            min_corroborators: 2,
            feed_capacity: 30,
        }
    }
}

impl DetectionConfig {
    /// Sets the round interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }
    
    /// Sets threshold and reading tolerance together.
    pub fn with_thresholds(mut self, threshold: i32, reading_difference: i32) -> Self {
        self.threshold = threshold;
        self.reading_difference = reading_difference;
        self
    }
    
    /// Sets the reference time tolerance.
    pub fn with_time_tolerance(mut self, tolerance: Duration) -> Self {
        self.time_tolerance_ms = u64::try_from(tolerance.as_millis()).unwrap_or(u64::MAX);
        self
    }
    
    /// Sets the reference ring capacity.
    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }
    
    /// Round cadence.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
    
    /// Reference feed cadence: twice per round, never below 1 ms.
    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis((self.interval_ms / 2).max(1))
    }
    
    /// Reference time tolerance in seconds of logical time.
    pub fn time_tolerance_secs(&self) -> f64 {
        Duration::from_millis(self.time_tolerance_ms).as_secs_f64()
    }
    
    /// Checks the parameters are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_reading < 0 {
            return Err(ConfigError::InvalidDetection(format!(
                "max_reading must be non-negative (got {})",
                self.max_reading
            )));
        }
        if self.reading_difference < 0 {
            return Err(ConfigError::InvalidDetection(format!(
                "reading_difference must be non-negative (got {})",
                self.reading_difference
            )));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidDetection("interval must be positive".to_string()));
        }
        if self.feed_capacity == 0 {
            return Err(ConfigError::InvalidDetection("feed capacity must be positive".to_string()));
        }
        if self.min_corroborators > crate::report::MAX_CORROBORATORS {
            return Err(ConfigError::InvalidDetection(format!(
                "min_corroborators cannot exceed {}",
                crate::report::MAX_CORROBORATORS
            )));
        }
        Ok(())
    }
}

/// How long the aggregator keeps the run going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundLimit {
    /// Stop once this many aggregator rounds have run
    Bounded(u32),
    
    /// Run until an external stop request
    Unbounded,
}

impl RoundLimit {
    /// Value accepted on the command line for "run forever".
    pub const UNBOUNDED_ARG: i64 = -1;
    
    /// Parses the externally supplied run length.
    ///
    /// `-1` means unbounded; any other value must be a positive round count.
    pub fn from_arg(max_rounds: i64) -> Result<Self, ConfigError> {
        if max_rounds == Self::UNBOUNDED_ARG {
            return Ok(RoundLimit::Unbounded);
        }
        match u32::try_from(max_rounds) {
            Ok(n) if n > 0 => Ok(RoundLimit::Bounded(n)),
            _ => Err(ConfigError::InvalidRoundLimit(max_rounds)),
        }
    }
    
    /// True once `completed_rounds` reaches the bound.
    pub fn is_reached(&self, completed_rounds: u32) -> bool {
        match self {
            RoundLimit::Bounded(max) => completed_rounds >= *max,
            RoundLimit::Unbounded => false,
        }
    }
}

impl std::fmt::Display for RoundLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundLimit::Bounded(n) => write!(f, "{} rounds", n),
            RoundLimit::Unbounded => write!(f, "unbounded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_detection_config_default() {
        let config = DetectionConfig::default();
        assert_eq!(config.threshold, 70);
        assert_eq!(config.reading_difference, 20);
        assert_eq!(config.time_tolerance_ms, 400);
        assert_eq!(config.feed_capacity, 30);
        assert_eq!(config.feed_interval(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }
    
    #[test]
    fn test_detection_config_rejects_zero_capacity() {
        let config = DetectionConfig::default().with_feed_capacity(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDetection(_))));
    }
    
    #[test]
    fn test_round_limit_from_arg() {
        assert_eq!(RoundLimit::from_arg(-1), Ok(RoundLimit::Unbounded));
        assert_eq!(RoundLimit::from_arg(5), Ok(RoundLimit::Bounded(5)));
        assert_eq!(RoundLimit::from_arg(0), Err(ConfigError::InvalidRoundLimit(0)));
        assert_eq!(RoundLimit::from_arg(-7), Err(ConfigError::InvalidRoundLimit(-7)));
    }
    
    #[test]
    fn test_round_limit_reached() {
        let limit = RoundLimit::Bounded(3);
        assert!(!limit.is_reached(2));
        assert!(limit.is_reached(3));
        assert!(!RoundLimit::Unbounded.is_reached(u32::MAX));
    }
}
