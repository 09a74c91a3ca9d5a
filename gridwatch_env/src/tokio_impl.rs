//! Production implementation of GridContext using Tokio.

use crate::GridContext;
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Production context backed by Tokio and OS entropy.
///
/// Time comes from the tokio clock (so paused test runtimes advance it
/// virtually), randomness from the operating system.
pub struct TokioContext {
    /// Run origin for the logical clock
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext; the logical clock starts now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
    
    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GridContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
    
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
    
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
    
    fn spawn<F>(&self, _name: &str, future: F) -> JoinHandle<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future)
    }
    
    fn derive_rng(&self, _seed_extension: u64) -> ChaCha8Rng {
        ChaCha8Rng::from_entropy()
    }
    
    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}
