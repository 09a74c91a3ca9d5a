//! Reference samples and the ring that holds them.
//!
//! The ring is a bounded historical window, not a log: one producer
//! overwrites slots oldest-first while the aggregator scans them. Each slot
//! sits behind its own short-lived mutex and readers always take a copy,
//! so a scan never observes a half-written sample and never blocks the
//! producer for longer than one slot copy.

use crate::topology::{GridPosition, GridTopology};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// One reading from the simulated remote-sensing source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSample {
    pub reading: i32,
    
    /// Grid cell the source was pointed at
    pub position: GridPosition,
    
    /// Logical clock (seconds since run origin)
    pub logical_time: f64,
    
    /// Wall clock (seconds since Unix epoch)
    pub wall_time: i64,
}

impl ReferenceSample {
    /// A random sample: uniform reading, uniform in-grid position.
    pub fn random<R: Rng>(
        rng: &mut R,
        topology: &GridTopology,
        max_reading: i32,
        logical_time: f64,
        wall_time: i64,
    ) -> Self {
        Self {
            reading: rng.gen_range(0..=max_reading.max(0)),
            position: GridPosition::new(
                rng.gen_range(0..topology.rows()),
                rng.gen_range(0..topology.cols()),
            ),
            logical_time,
            wall_time,
        }
    }
}

/// Fixed-capacity circular buffer of reference samples.
pub struct ReferenceRing {
    slots: Box<[Mutex<ReferenceSample>]>,
    
    /// Next slot to overwrite (the oldest)
    next: AtomicUsize,
}

impl ReferenceRing {
    /// Creates a ring with every slot pre-filled by `fill(slot_index)`.
    ///
    /// A zero capacity is bumped to one so the ring is never empty.
    pub fn prefilled(capacity: usize, mut fill: impl FnMut(usize) -> ReferenceSample) -> Self {
        let slots = (0..capacity.max(1))
            .map(|i| Mutex::new(fill(i)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            next: AtomicUsize::new(0),
        }
    }
    
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
    
    /// Index of the slot the next `push` will overwrite.
    pub fn next_index(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }
    
    /// Overwrites the oldest slot and advances the write index.
    ///
    /// Single producer only: the index update is not a compare-and-swap.
    /// Returns the slot that was written.
    pub fn push(&self, sample: ReferenceSample) -> usize {
        let index = self.next.load(Ordering::Acquire);
        *self.slots[index].lock().unwrap_or_else(PoisonError::into_inner) = sample;
        self.next.store((index + 1) % self.slots.len(), Ordering::Release);
        index
    }
    
    /// Copy of the sample in `index`.
    pub fn get(&self, index: usize) -> Option<ReferenceSample> {
        self.slots
            .get(index)
            .map(|slot| *slot.lock().unwrap_or_else(PoisonError::into_inner))
    }
    
    /// First sample in storage order (slot 0 upward) satisfying `predicate`.
    ///
    /// Each slot is copied before the predicate sees it.
    pub fn find(&self, mut predicate: impl FnMut(&ReferenceSample) -> bool) -> Option<ReferenceSample> {
        for slot in self.slots.iter() {
            let sample = *slot.lock().unwrap_or_else(PoisonError::into_inner);
            if predicate(&sample) {
                return Some(sample);
            }
        }
        None
    }
    
    /// Copies of every slot in storage order.
    pub fn snapshot(&self) -> Vec<ReferenceSample> {
        self.slots
            .iter()
            .map(|slot| *slot.lock().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }
}
