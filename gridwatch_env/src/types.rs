//! Common types for the GridWatch environment abstraction.

use serde::{Deserialize, Serialize};

/// Identifier of a participant in the run (its rank).
///
/// Workers occupy ranks `0..rows*cols` in row-major order; the aggregator
/// always holds the last rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Creates a NodeId from a rank.
    pub fn new(rank: u32) -> Self {
        Self(rank)
    }
    
    /// Returns the rank as an index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Envelope for messages transmitted between nodes.
///
/// This is a transport-layer wrapper - the payload is opaque bytes that the
/// receiving node decodes with the matching wire codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Encoded message bytes
    pub payload: Vec<u8>,
    
    /// Sender's logical clock when the envelope was created (ms)
    pub timestamp_ms: u64,
}

impl Envelope {
    /// Creates a new envelope from payload bytes.
    pub fn new(payload: Vec<u8>, timestamp_ms: u64) -> Self {
        Self {
            payload,
            timestamp_ms,
        }
    }
    
    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
