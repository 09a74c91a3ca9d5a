//! Error types for the GridWatch environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
///
/// All of these are fatal to a run: the protocol has no retry path.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Network send or receive failed (channel closed, peer gone)
    #[error("Network error: {0}")]
    NetworkError(String),
    
    /// Target node is not part of the fabric
    #[error("Node unreachable: {0}")]
    NodeUnreachable(String),
    
    /// A collective operation received a message that does not belong to it
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }
    
    /// Creates an unreachable error.
    pub fn unreachable(node: impl std::fmt::Display) -> Self {
        Self::NodeUnreachable(node.to_string())
    }
    
    /// Creates a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }
}
