//! The event report and its fixed-layout wire format.
//!
//! # Wire layout (big-endian, 104 bytes)
//!
//! ```text
//! offset  field               type
//!      0  round               i32
//!      4  reading             i32
//!      8  origin_rank         i32
//!     12  origin_row          i32
//!     16  origin_col          i32
//!     20  neighbor_count      i32   (0..=4)
//!     24  neighbor_ranks      i32[4]
//!     40  neighbor_rows       i32[4]
//!     56  neighbor_cols       i32[4]
//!     72  neighbor_readings   i32[4]
//!     88  logical_time        f64
//!     96  wall_time           i64
//! ```
//!
//! Only the first `neighbor_count` entries of each neighbour array carry
//! data; the rest encode as zero and are ignored on decode.

use crate::topology::GridPosition;
use gridwatch_env::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural bound on corroborators: one per grid direction.
pub const MAX_CORROBORATORS: usize = 4;

/// Encoded size of a [`Report`].
pub const REPORT_WIRE_SIZE: usize = 6 * 4 + 4 * MAX_CORROBORATORS * 4 + 8 + 8;

/// Errors from encoding or decoding a report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("Report must be 104 bytes, got {0}")]
    WrongLength(usize),
    
    #[error("Neighbor count {0} outside 0..=4")]
    InvalidNeighborCount(i32),
    
    #[error("Field {field} has out-of-range value {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// A neighbour whose reading agreed with the reporting node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corroborator {
    pub id: NodeId,
    pub position: GridPosition,
    pub reading: i32,
}

/// Fixed-capacity list of up to four corroborators with an explicit length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Corroborators {
    entries: [Corroborator; MAX_CORROBORATORS],
    len: usize,
}

impl Corroborators {
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Appends an entry. Returns `false` (and drops it) when already full.
    pub fn push(&mut self, entry: Corroborator) -> bool {
        if self.len == MAX_CORROBORATORS {
            return false;
        }
        self.entries[self.len] = entry;
        self.len += 1;
        true
    }
    
    pub fn len(&self) -> usize {
        self.len
    }
    
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    
    pub fn as_slice(&self) -> &[Corroborator] {
        &self.entries[..self.len]
    }
    
    pub fn iter(&self) -> impl Iterator<Item = &Corroborator> {
        self.as_slice().iter()
    }
}

impl Serialize for Corroborators {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Corroborators {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<Corroborator>::deserialize(deserializer)?;
        if entries.len() > MAX_CORROBORATORS {
            return Err(serde::de::Error::invalid_length(entries.len(), &"at most 4 corroborators"));
        }
        let mut list = Corroborators::new();
        for entry in entries {
            list.push(entry);
        }
        Ok(list)
    }
}

/// A corroborated anomaly, sent once from a worker to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Worker round in which the anomaly was observed
    pub round: u32,
    
    /// Reporting node
    pub origin: NodeId,
    pub position: GridPosition,
    
    /// The anomalous reading value
    pub reading: i32,
    
    /// Logical clock at send time (seconds since run origin)
    pub logical_time: f64,
    
    /// Wall clock at send time (seconds since Unix epoch)
    pub wall_time: i64,
    
    /// Neighbours that agreed within tolerance
    pub corroborators: Corroborators,
}

impl Report {
    /// Number of corroborating neighbours (the wire `neighbor_count`).
    pub fn matching_neighbours(&self) -> usize {
        self.corroborators.len()
    }
    
    /// Encodes to the fixed wire layout.
    pub fn encode(&self) -> Result<Vec<u8>, ReportError> {
        let mut buf = Vec::with_capacity(REPORT_WIRE_SIZE);
        
        put_i32(&mut buf, to_wire("round", self.round)?);
        put_i32(&mut buf, self.reading);
        put_i32(&mut buf, to_wire("origin_rank", self.origin.0)?);
        put_i32(&mut buf, to_wire("origin_row", self.position.row)?);
        put_i32(&mut buf, to_wire("origin_col", self.position.col)?);
        // len() <= 4 by construction
        put_i32(&mut buf, self.corroborators.len() as i32);
        
        let mut ranks = [0i32; MAX_CORROBORATORS];
        let mut rows = [0i32; MAX_CORROBORATORS];
        let mut cols = [0i32; MAX_CORROBORATORS];
        let mut readings = [0i32; MAX_CORROBORATORS];
        for (i, c) in self.corroborators.iter().enumerate() {
            ranks[i] = to_wire("neighbor_rank", c.id.0)?;
            rows[i] = to_wire("neighbor_row", c.position.row)?;
            cols[i] = to_wire("neighbor_col", c.position.col)?;
            readings[i] = c.reading;
        }
        for array in [ranks, rows, cols, readings] {
            for value in array {
                put_i32(&mut buf, value);
            }
        }
        
        buf.extend_from_slice(&self.logical_time.to_be_bytes());
        buf.extend_from_slice(&self.wall_time.to_be_bytes());
        
        debug_assert_eq!(buf.len(), REPORT_WIRE_SIZE);
        Ok(buf)
    }
    
    /// Decodes from the fixed wire layout.
    pub fn decode(bytes: &[u8]) -> Result<Self, ReportError> {
        if bytes.len() != REPORT_WIRE_SIZE {
            return Err(ReportError::WrongLength(bytes.len()));
        }
        let mut cursor = Cursor { bytes, offset: 0 };
        
        let round = from_wire("round", cursor.i32())?;
        let reading = cursor.i32();
        let origin = NodeId(from_wire("origin_rank", cursor.i32())?);
        let position = GridPosition::new(
            from_wire("origin_row", cursor.i32())?,
            from_wire("origin_col", cursor.i32())?,
        );
        let count = cursor.i32();
        let len = usize::try_from(count)
            .ok()
            .filter(|n| *n <= MAX_CORROBORATORS)
            .ok_or(ReportError::InvalidNeighborCount(count))?;
        
        let ranks = cursor.i32_array();
        let rows = cursor.i32_array();
        let cols = cursor.i32_array();
        let readings = cursor.i32_array();
        
        let mut corroborators = Corroborators::new();
        for i in 0..len {
            corroborators.push(Corroborator {
                id: NodeId(from_wire("neighbor_rank", ranks[i])?),
                position: GridPosition::new(
                    from_wire("neighbor_row", rows[i])?,
                    from_wire("neighbor_col", cols[i])?,
                ),
                reading: readings[i],
            });
        }
        
        let logical_time = f64::from_be_bytes(cursor.take());
        let wall_time = i64::from_be_bytes(cursor.take());
        
        Ok(Self {
            round,
            origin,
            position,
            reading,
            logical_time,
            wall_time,
            corroborators,
        })
    }
}

fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn to_wire(field: &'static str, value: u32) -> Result<i32, ReportError> {
    i32::try_from(value).map_err(|_| ReportError::OutOfRange {
        field,
        value: i64::from(value),
    })
}

fn from_wire(field: &'static str, value: i32) -> Result<u32, ReportError> {
    u32::try_from(value).map_err(|_| ReportError::OutOfRange {
        field,
        value: i64::from(value),
    })
}

/// Reads fixed-width fields; the total length is checked up front.
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        out
    }
    
    fn i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take())
    }
    
    fn i32_array(&mut self) -> [i32; MAX_CORROBORATORS] {
        let mut out = [0i32; MAX_CORROBORATORS];
        for slot in out.iter_mut() {
            *slot = self.i32();
        }
        out
    }
}
