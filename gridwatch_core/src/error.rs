//! Configuration errors.
//!
//! These are detected before any node enters its round loop and abort the
//! whole run.

use thiserror::Error;

/// A run was configured in a way the protocol cannot execute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Rows or columns were zero or negative
    #[error("Rows and cols must be larger than 0 (got {rows}x{cols})")]
    NonPositiveDimensions { rows: i64, cols: i64 },
    
    /// The participant count does not match the grid plus one aggregator
    #[error("Must run with (rows * cols + 1) = {expected} participants instead of {actual}")]
    ParticipantMismatch { expected: usize, actual: usize },
    
    /// The grid has more ranks than the wire format can carry
    #[error("Grid of {rows}x{cols} exceeds the 32-bit rank space")]
    GridTooLarge { rows: i64, cols: i64 },
    
    /// The round limit is neither positive nor the unbounded sentinel
    #[error("Max rounds must be a positive number or -1 to run until stopped (got {0})")]
    InvalidRoundLimit(i64),
    
    /// A detection parameter is out of range
    #[error("Invalid detection parameter: {0}")]
    InvalidDetection(String),
}
