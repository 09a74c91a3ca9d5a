//! In-process message fabric.
//!
//! Every participant owns one unbounded mailbox. Sends never block, which
//! gives the buffered fire-and-forget semantics reports rely on.

use async_trait::async_trait;
use gridwatch_env::{EnvError, Envelope, NodeId, Transport};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

type Mailbox = mpsc::UnboundedSender<(NodeId, Envelope)>;

/// Network interface for one participant.
pub struct SimNetwork {
    /// This node's ID
    local_id: NodeId,
    
    /// Mailboxes of every participant, indexed by rank
    peers: Arc<Vec<Mailbox>>,
    
    /// Incoming messages (behind tokio mutex for async)
    rx: Mutex<mpsc::UnboundedReceiver<(NodeId, Envelope)>>,
}

impl SimNetwork {
    /// Builds a fully connected fabric for `participants` nodes.
    ///
    /// The returned interfaces are ordered by rank.
    pub fn mesh(participants: usize) -> Vec<SimNetwork> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..participants).map(|_| mpsc::unbounded_channel()).unzip();
        let peers = Arc::new(senders);
        
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| SimNetwork {
                local_id: NodeId(rank as u32),
                peers: Arc::clone(&peers),
                rx: Mutex::new(rx),
            })
            .collect()
    }
    
    /// Number of participants reachable through this fabric.
    pub fn participants(&self) -> usize {
        self.peers.len()
    }
}

#[async_trait]
impl Transport for SimNetwork {
    fn send(&self, target: NodeId, envelope: Envelope) -> Result<(), EnvError> {
        let mailbox = self
            .peers
            .get(target.index())
            .ok_or_else(|| EnvError::unreachable(format!("no participant {}", target)))?;
        
        mailbox
            .send((self.local_id, envelope))
            .map_err(|_| EnvError::network(format!("mailbox of {} closed", target)))
    }
    
    fn try_recv(&self) -> Result<Option<(NodeId, Envelope)>, EnvError> {
        let mut rx = self
            .rx
            .try_lock()
            .map_err(|_| EnvError::protocol("receiver already in use"))?;
        
        match rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(EnvError::network("fabric closed")),
        }
    }
    
    async fn recv(&self) -> Option<(NodeId, Envelope)> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
    
    fn local_id(&self) -> NodeId {
        self.local_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[tokio::test]
    async fn test_point_to_point_delivery() {
        let nodes = SimNetwork::mesh(3);
        assert_eq!(nodes[0].participants(), 3);
        
        nodes[0].send(NodeId(2), Envelope::new(vec![1, 2, 3], 0)).unwrap();
        nodes[1].send(NodeId(2), Envelope::new(vec![4], 5)).unwrap();
        
        let (from, envelope) = nodes[2].recv().await.unwrap();
        assert_eq!(from, NodeId(0));
        assert_eq!(envelope.payload, vec![1, 2, 3]);
        
        let (from, envelope) = nodes[2].try_recv().unwrap().unwrap();
        assert_eq!(from, NodeId(1));
        assert_eq!(envelope.timestamp_ms, 5);
    }
    
    #[tokio::test]
    async fn test_try_recv_empty() {
        let nodes = SimNetwork::mesh(2);
        assert!(nodes[1].try_recv().unwrap().is_none());
    }
    
    #[tokio::test]
    async fn test_unknown_target() {
        let nodes = SimNetwork::mesh(2);
        let result = nodes[0].send(NodeId(9), Envelope::new(vec![], 0));
        assert!(matches!(result, Err(EnvError::NodeUnreachable(_))));
    }
    
    #[tokio::test]
    async fn test_closed_mailbox() {
        let mut nodes = SimNetwork::mesh(2);
        let receiver = nodes.pop().unwrap();
        drop(receiver);
        
        let result = nodes[0].send(NodeId(1), Envelope::new(vec![], 0));
        assert!(matches!(result, Err(EnvError::NetworkError(_))));
    }
}
