//! Collective operations among workers: neighbour all-gather and the round barrier.

use gridwatch_core::{Direction, NeighborReadings, NeighborSet, ABSENT_READING};
use gridwatch_env::{EnvError, Envelope, NodeId, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Wire size of one exchanged value: round (u32) + reading (i32), big-endian.
const EXCHANGE_WIRE_SIZE: usize = 8;

/// One value sent to a neighbour, tagged with the round it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExchangeMessage {
    round: u32,
    value: i32,
}

impl ExchangeMessage {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(EXCHANGE_WIRE_SIZE);
        bytes.extend_from_slice(&self.round.to_be_bytes());
        bytes.extend_from_slice(&self.value.to_be_bytes());
        bytes
    }
    
    fn decode(bytes: &[u8]) -> Result<Self, EnvError> {
        let bytes: [u8; EXCHANGE_WIRE_SIZE] = bytes.try_into().map_err(|_| {
            EnvError::protocol(format!("exchange message must be 8 bytes, got {}", bytes.len()))
        })?;
        let [r0, r1, r2, r3, v0, v1, v2, v3] = bytes;
        Ok(Self {
            round: u32::from_be_bytes([r0, r1, r2, r3]),
            value: i32::from_be_bytes([v0, v1, v2, v3]),
        })
    }
}

/// Per-worker state of the neighbour all-gather.
///
/// Every worker sends its value to each present neighbour and then waits
/// for exactly one value per present neighbour for the same round.
/// Messages for a later round are held back until that round is gathered.
pub struct NeighborExchange {
    neighbors: NeighborSet,
    early: Vec<(NodeId, ExchangeMessage)>,
}

impl NeighborExchange {
    pub fn new(neighbors: NeighborSet) -> Self {
        Self {
            neighbors,
            early: Vec::new(),
        }
    }
    
    pub fn neighbors(&self) -> &NeighborSet {
        &self.neighbors
    }
    
    /// Exchanges `value` with all present neighbours for `round`.
    ///
    /// Absent neighbours keep the `-1` sentinel in the result.
    pub async fn all_gather<T: Transport>(
        &mut self,
        transport: &T,
        round: u32,
        value: i32,
        timestamp_ms: u64,
    ) -> Result<NeighborReadings, EnvError> {
        let payload = ExchangeMessage { round, value }.encode();
        for (_, neighbor) in self.neighbors.present() {
            transport.send(neighbor.id, Envelope::new(payload.clone(), timestamp_ms))?;
        }
        
        let mut readings = NeighborReadings::absent();
        let mut missing = self.neighbors.count();
        
        // Values that arrived during an earlier gather
        let held = std::mem::take(&mut self.early);
        for (from, message) in held {
            if self.accept(from, message, round, &mut readings)? {
                missing -= 1;
            }
        }
        
        while missing > 0 {
            let (from, envelope) = transport
                .recv()
                .await
                .ok_or_else(|| EnvError::network("fabric closed during neighbour exchange"))?;
            let message = ExchangeMessage::decode(&envelope.payload)?;
            if self.accept(from, message, round, &mut readings)? {
                missing -= 1;
            }
        }
        
        Ok(readings)
    }
    
    /// Files one incoming value. Returns true when it fills a slot for `round`.
    fn accept(
        &mut self,
        from: NodeId,
        message: ExchangeMessage,
        round: u32,
        readings: &mut NeighborReadings,
    ) -> Result<bool, EnvError> {
        let direction = self
            .direction_of(from)
            .ok_or_else(|| EnvError::protocol(format!("exchange value from non-neighbour {}", from)))?;
        
        if message.round > round {
            self.early.push((from, message));
            return Ok(false);
        }
        if message.round < round {
            return Err(EnvError::protocol(format!(
                "stale exchange value from {} for round {} during round {}",
                from, message.round, round
            )));
        }
        if readings.get(direction).is_some() || message.value == ABSENT_READING {
            return Err(EnvError::protocol(format!(
                "unexpected exchange value {} from {} in round {}",
                message.value, from, round
            )));
        }
        
        readings.set(direction, message.value);
        Ok(true)
    }
    
    fn direction_of(&self, id: NodeId) -> Option<Direction> {
        self.neighbors
            .present()
            .find(|(_, neighbor)| neighbor.id == id)
            .map(|(direction, _)| direction)
    }
}

/// Barrier over the workers that also agrees on whether to stop.
///
/// Each worker contributes what it observed; every worker leaves with the
/// OR of all contributions. The second wait keeps a fast worker's next
/// contribution out of the current decision.
#[derive(Clone)]
pub struct RoundBarrier {
    barrier: Arc<Barrier>,
    stop: Arc<AtomicBool>,
}

impl RoundBarrier {
    pub fn new(workers: usize) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(workers)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
    
    /// Waits for all workers; returns true if any of them observed termination.
    pub async fn sync_round(&self, observed: bool) -> bool {
        if observed {
            self.stop.store(true, Ordering::SeqCst);
        }
        self.barrier.wait().await;
        let decision = self.stop.load(Ordering::SeqCst);
        self.barrier.wait().await;
        decision
    }
}
