//! Sensor readings and where they come from.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Marker for an exchange slot with no neighbour behind it.
pub const ABSENT_READING: i32 = -1;

/// A single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Measured value in `0..=max_reading`
    pub value: i32,
    
    /// Logical clock (seconds since the run origin)
    pub logical_time: f64,
    
    /// Wall-clock capture instant (seconds since the Unix epoch), display only
    pub wall_time: i64,
}

impl Reading {
    pub fn new(value: i32, logical_time: f64, wall_time: i64) -> Self {
        Self {
            value,
            logical_time,
            wall_time,
        }
    }
}

/// Produces one reading value per round.
pub trait ReadingSource: Send {
    fn next_value(&mut self) -> i32;
}

/// Uniform readings in `0..=max`, drawn from a seeded stream.
pub struct RandomReadings {
    rng: ChaCha8Rng,
    max: i32,
}

impl RandomReadings {
    pub fn new(rng: ChaCha8Rng, max: i32) -> Self {
        Self { rng, max: max.max(0) }
    }
}

impl ReadingSource for RandomReadings {
    fn next_value(&mut self) -> i32 {
        self.rng.gen_range(0..=self.max)
    }
}

/// Replays a fixed list of values, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedReadings {
    values: Vec<i32>,
    cursor: usize,
}

impl ScriptedReadings {
    pub fn new(values: Vec<i32>) -> Self {
        Self { values, cursor: 0 }
    }
    
    /// The same value every round.
    pub fn constant(value: i32) -> Self {
        Self::new(vec![value])
    }
}

impl ReadingSource for ScriptedReadings {
    fn next_value(&mut self) -> i32 {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    
    #[test]
    fn test_random_readings_stay_in_range() {
        let mut source = RandomReadings::new(ChaCha8Rng::seed_from_u64(1), 100);
        for _ in 0..1000 {
            let value = source.next_value();
            assert!((0..=100).contains(&value));
        }
    }
    
    #[test]
    fn test_random_readings_are_reproducible() {
        let mut a = RandomReadings::new(ChaCha8Rng::seed_from_u64(9), 100);
        let mut b = RandomReadings::new(ChaCha8Rng::seed_from_u64(9), 100);
        let left: Vec<i32> = (0..20).map(|_| a.next_value()).collect();
        let right: Vec<i32> = (0..20).map(|_| b.next_value()).collect();
        assert_eq!(left, right);
    }
    
    #[test]
    fn test_scripted_readings_cycle() {
        let mut source = ScriptedReadings::new(vec![1, 2, 3]);
        let values: Vec<i32> = (0..5).map(|_| source.next_value()).collect();
        assert_eq!(values, vec![1, 2, 3, 1, 2]);
        
        let mut empty = ScriptedReadings::new(Vec::new());
        assert_eq!(empty.next_value(), 0);
    }
}
