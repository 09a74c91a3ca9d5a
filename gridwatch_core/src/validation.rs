//! Cross-validation of reports against the reference ring.

use crate::config::DetectionConfig;
use crate::feed::{ReferenceRing, ReferenceSample};
use crate::report::Report;
use serde::{Deserialize, Serialize};

/// Outcome of checking one report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    /// A reference sample agreed; a copy of it is kept for the event log
    Confirmed(ReferenceSample),
    
    /// No sample agreed
    Unconfirmed,
}

impl Classification {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Classification::Confirmed(_))
    }
    
    /// The matching sample, if confirmed.
    pub fn sample(&self) -> Option<&ReferenceSample> {
        match self {
            Classification::Confirmed(sample) => Some(sample),
            Classification::Unconfirmed => None,
        }
    }
    
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Confirmed(_) => "confirmed",
            Classification::Unconfirmed => "unconfirmed",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Same cell, reading within tolerance, logical time within tolerance.
pub fn sample_matches(sample: &ReferenceSample, report: &Report, config: &DetectionConfig) -> bool {
    let same_position = sample.position == report.position;
    let close_reading = (sample.reading - report.reading).abs() <= config.reading_difference;
    let close_time = (sample.logical_time - report.logical_time).abs() <= config.time_tolerance_secs();
    
    same_position && close_reading && close_time
}

/// Scans the whole ring in storage order; the first match wins.
pub fn cross_validate(report: &Report, ring: &ReferenceRing, config: &DetectionConfig) -> Classification {
    match ring.find(|sample| sample_matches(sample, report, config)) {
        Some(sample) => Classification::Confirmed(sample),
        None => Classification::Unconfirmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Corroborators;
    use crate::topology::GridPosition;
    use gridwatch_env::NodeId;
    use std::time::Duration;
    
    fn config() -> DetectionConfig {
        DetectionConfig::default()
            .with_thresholds(80, 5)
            .with_time_tolerance(Duration::from_millis(200))
    }
    
    fn report() -> Report {
        Report {
            round: 10,
            origin: NodeId(17),
            position: GridPosition::new(2, 3),
            reading: 85,
            logical_time: 10.000,
            wall_time: 0,
            corroborators: Corroborators::new(),
        }
    }
    
    fn sample(reading: i32, row: u32, col: u32, t: f64) -> ReferenceSample {
        ReferenceSample {
            reading,
            position: GridPosition::new(row, col),
            logical_time: t,
            wall_time: 0,
        }
    }
    
    #[test]
    fn test_matching_sample_confirms() {
        let ring = ReferenceRing::prefilled(3, |_| sample(0, 0, 0, 0.0));
        ring.push(sample(83, 2, 3, 10.120));
        
        let result = cross_validate(&report(), &ring, &config());
        assert!(result.is_confirmed());
        assert_eq!(result.sample().map(|s| s.reading), Some(83));
    }
    
    #[test]
    fn test_wrong_position_does_not_match() {
        let ring = ReferenceRing::prefilled(3, |_| sample(0, 0, 0, 0.0));
        ring.push(sample(83, 2, 4, 10.050));
        
        assert_eq!(cross_validate(&report(), &ring, &config()), Classification::Unconfirmed);
    }
    
    #[test]
    fn test_time_and_reading_tolerances() {
        let cfg = config();
        let r = report();
        
        assert!(sample_matches(&sample(80, 2, 3, 9.800), &r, &cfg));
        assert!(!sample_matches(&sample(79, 2, 3, 10.0), &r, &cfg));
        assert!(!sample_matches(&sample(85, 2, 3, 10.201), &r, &cfg));
    }
    
    #[test]
    fn test_first_match_in_storage_order_wins() {
        let ring = ReferenceRing::prefilled(4, |_| sample(0, 0, 0, 0.0));
        ring.push(sample(84, 2, 3, 10.1)); // slot 0
        ring.push(sample(86, 2, 3, 10.0)); // slot 1 - closer in time, still loses
        
        let result = cross_validate(&report(), &ring, &config());
        assert_eq!(result.sample().map(|s| s.reading), Some(84));
    }
}
