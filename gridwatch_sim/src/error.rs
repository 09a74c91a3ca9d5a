//! Error type for a simulation run.

use gridwatch_core::{ConfigError, ReportError};
use gridwatch_env::EnvError;
use thiserror::Error;

/// Anything that ends a run early.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    
    #[error("Transport error: {0}")]
    Transport(#[from] EnvError),
    
    #[error("Malformed report: {0}")]
    Report(#[from] ReportError),
    
    #[error("Event log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Task failed to join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SimError {
    /// Configuration errors are the caller's fault; the CLI prints usage for them.
    pub fn is_config(&self) -> bool {
        matches!(self, SimError::Config(_))
    }
}
