//! Network transport abstraction for GridWatch nodes.

use crate::error::EnvError;
use crate::types::{Envelope, NodeId};
use async_trait::async_trait;

/// Point-to-point messaging between nodes.
///
/// # Packet Flow
///
/// ```text
/// Worker                     Fabric                    Aggregator
///   |                           |                          |
///   |-- send(agg, envelope) --->|  (buffered, no wait)     |
///   |                           |------------------------->|
///   |                           |                          |-- try_recv() -> Some
///   |                           |                          |-- try_recv() -> None
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Queues an envelope for delivery to `target`.
    ///
    /// Sends are buffered: this never waits for the receiver.
    ///
    /// # Returns
    /// * `Ok(())` - Envelope queued for delivery
    /// * `Err(EnvError::NodeUnreachable)` - Unknown target
    /// * `Err(EnvError::NetworkError)` - The target's mailbox is closed
    fn send(&self, target: NodeId, envelope: Envelope) -> Result<(), EnvError>;
    
    /// Receives the next envelope if one is already queued.
    ///
    /// This is the probe-then-receive primitive: it never suspends.
    ///
    /// # Returns
    /// * `Ok(Some((sender, envelope)))` - An envelope was waiting
    /// * `Ok(None)` - Nothing queued right now
    /// * `Err(EnvError::NetworkError)` - The mailbox was disconnected
    fn try_recv(&self) -> Result<Option<(NodeId, Envelope)>, EnvError>;
    
    /// Waits for the next envelope addressed to this node.
    ///
    /// Returns `None` once every sender is gone.
    async fn recv(&self) -> Option<(NodeId, Envelope)>;
    
    /// Returns this node's ID.
    fn local_id(&self) -> NodeId;
}
