//! GridWatch Core - detection and validation logic for a sensor grid
//!
//! This library holds the pure, I/O-free parts of the protocol:
//! 1. **Topology**: rank ↔ grid position, four-neighbour adjacency without wraparound
//! 2. **Detection**: threshold + neighbour corroboration, producing [`Report`]s
//! 3. **Wire format**: fixed 104-byte big-endian encoding of a report
//! 4. **Validation**: first-match scan of the [`ReferenceRing`] and run statistics
//!
//! Scheduling, messaging and the reference feed task live in `gridwatch_sim`.

pub mod config;
pub mod detection;
pub mod error;
pub mod feed;
pub mod reading;
pub mod report;
pub mod stats;
pub mod topology;
pub mod validation;

// Re-export key types for convenience
pub use config::{DetectionConfig, RoundLimit};
pub use detection::{detect, NeighborReadings, RoundObservation};
pub use error::ConfigError;
pub use feed::{ReferenceRing, ReferenceSample};
pub use reading::{RandomReadings, Reading, ReadingSource, ScriptedReadings, ABSENT_READING};
pub use report::{Corroborator, Corroborators, Report, ReportError, MAX_CORROBORATORS, REPORT_WIRE_SIZE};
pub use stats::{RunStatistics, RunSummary, StopReason};
pub use topology::{Direction, GridPosition, GridTopology, Neighbor, NeighborSet};
pub use validation::{cross_validate, Classification};
