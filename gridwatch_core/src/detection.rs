//! The corroboration rule.
//!
//! A worker raises a report when its own reading is at or above the
//! threshold and enough present neighbours read within tolerance of it in
//! the same round.

use crate::config::DetectionConfig;
use crate::reading::{Reading, ABSENT_READING};
use crate::report::{Corroborator, Corroborators, Report};
use crate::topology::{Direction, GridPosition, NeighborSet};
use gridwatch_env::NodeId;

/// Values received from the four neighbour slots in one exchange.
///
/// Slots without a neighbour hold [`ABSENT_READING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborReadings([i32; 4]);

impl NeighborReadings {
    /// Every slot absent.
    pub fn absent() -> Self {
        Self([ABSENT_READING; 4])
    }
    
    pub fn from_slots(slots: [i32; 4]) -> Self {
        Self(slots)
    }
    
    pub fn set(&mut self, direction: Direction, value: i32) {
        self.0[direction.index()] = value;
    }
    
    /// The value in `direction`, or `None` for an absent slot.
    pub fn get(&self, direction: Direction) -> Option<i32> {
        let value = self.0[direction.index()];
        (value != ABSENT_READING).then_some(value)
    }
    
    pub fn slots(&self) -> [i32; 4] {
        self.0
    }
}

impl Default for NeighborReadings {
    fn default() -> Self {
        Self::absent()
    }
}

/// What a worker knows about itself at decision time.
#[derive(Debug, Clone, Copy)]
pub struct RoundObservation {
    pub round: u32,
    pub origin: NodeId,
    pub position: GridPosition,
    pub reading: Reading,
}

/// Present neighbours whose value is within tolerance of `value`, in slot order.
pub fn collect_corroborators(
    origin: NodeId,
    value: i32,
    neighbors: &NeighborSet,
    readings: &NeighborReadings,
    config: &DetectionConfig,
) -> Corroborators {
    let mut matches = Corroborators::new();
    
    for (direction, neighbor) in neighbors.present() {
        if neighbor.id == origin {
            continue;
        }
        let Some(theirs) = readings.get(direction) else {
            continue;
        };
        if (value - theirs).abs() <= config.reading_difference {
            matches.push(Corroborator {
                id: neighbor.id,
                position: neighbor.position,
                reading: theirs,
            });
        }
    }
    
    matches
}

/// Applies the full rule; returns the report to send, if any.
pub fn detect(
    observation: &RoundObservation,
    neighbors: &NeighborSet,
    readings: &NeighborReadings,
    config: &DetectionConfig,
) -> Option<Report> {
    let reading = observation.reading;
    if reading.value < config.threshold {
        return None;
    }
    
    let corroborators = collect_corroborators(
        observation.origin,
        reading.value,
        neighbors,
        readings,
        config,
    );
    if corroborators.len() < config.min_corroborators {
        return None;
    }
    
    Some(Report {
        round: observation.round,
        origin: observation.origin,
        position: observation.position,
        reading: reading.value,
        logical_time: reading.logical_time,
        wall_time: reading.wall_time,
        corroborators,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::GridTopology;
    use proptest::prelude::*;
    
    fn config() -> DetectionConfig {
        DetectionConfig::default().with_thresholds(80, 5)
    }
    
    fn observe(topology: &GridTopology, id: NodeId, value: i32) -> RoundObservation {
        RoundObservation {
            round: 3,
            origin: id,
            position: topology.position_of(id).unwrap(),
            reading: Reading::new(value, 3.0, 0),
        }
    }
    
    #[test]
    fn test_reports_with_two_matching_neighbours() {
        let topology = GridTopology::new(3, 3).unwrap();
        let id = NodeId(4);
        let readings = NeighborReadings::from_slots([83, 10, 87, 20]);
        
        let report = detect(&observe(&topology, id, 85), &topology.neighbors(id), &readings, &config())
            .expect("two neighbours within 5 of 85");
        
        assert_eq!(report.matching_neighbours(), 2);
        let ids: Vec<NodeId> = report.corroborators.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(3)]);
        assert_eq!(report.corroborators.as_slice()[1].reading, 87);
    }
    
    #[test]
    fn test_no_report_below_threshold() {
        let topology = GridTopology::new(3, 3).unwrap();
        let id = NodeId(4);
        let readings = NeighborReadings::from_slots([79, 79, 79, 79]);
        
        assert!(detect(&observe(&topology, id, 79), &topology.neighbors(id), &readings, &config()).is_none());
    }
    
    #[test]
    fn test_no_report_with_single_match() {
        let topology = GridTopology::new(3, 3).unwrap();
        let id = NodeId(4);
        let readings = NeighborReadings::from_slots([90, 0, 0, 0]);
        
        assert!(detect(&observe(&topology, id, 90), &topology.neighbors(id), &readings, &config()).is_none());
    }
    
    #[test]
    fn test_absent_slots_never_match() {
        // Corner node: Up and Left are absent. Even if the slot values happened
        // to look close, absent neighbours must be skipped.
        let topology = GridTopology::new(2, 2).unwrap();
        let id = NodeId(0);
        let readings = NeighborReadings::from_slots([90, 90, 90, 0]);
        
        let matches = collect_corroborators(id, 90, &topology.neighbors(id), &readings, &config());
        
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.as_slice()[0].id, NodeId(2));
    }
    
    #[test]
    fn test_threshold_is_inclusive() {
        let topology = GridTopology::new(3, 3).unwrap();
        let id = NodeId(4);
        let readings = NeighborReadings::from_slots([80, 80, 0, 0]);
        
        assert!(detect(&observe(&topology, id, 80), &topology.neighbors(id), &readings, &config()).is_some());
    }
    
    proptest! {
        #[test]
        fn prop_report_iff_rule_holds(
            rows in 1i64..6,
            cols in 1i64..6,
            seed_index in 0usize..36,
            own in 0i32..=100,
            slots in proptest::array::uniform4(0i32..=100),
        ) {
            let topology = GridTopology::new(rows, cols).unwrap();
            let id = NodeId((seed_index % topology.worker_count()) as u32);
            let neighbors = topology.neighbors(id);
            let mut readings = NeighborReadings::absent();
            for (dir, _) in neighbors.present() {
                readings.set(dir, slots[dir.index()]);
            }
            let cfg = config();
            
            let expected_matches = neighbors
                .present()
                .filter(|(dir, _)| (own - slots[dir.index()]).abs() <= cfg.reading_difference)
                .count();
            let should_report = own >= cfg.threshold && expected_matches >= 2;
            
            let report = detect(&observe(&topology, id, own), &neighbors, &readings, &cfg);
            prop_assert_eq!(report.is_some(), should_report);
            
            if let Some(report) = report {
                prop_assert_eq!(report.matching_neighbours(), expected_matches);
                prop_assert!(report.matching_neighbours() <= 4);
                for c in report.corroborators.iter() {
                    prop_assert_ne!(c.id, id);
                    prop_assert!(neighbors.present().any(|(_, n)| n.id == c.id));
                }
            }
        }
    }
}
