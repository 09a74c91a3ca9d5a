//! Simulation context implementing GridContext for reproducible runs.

use async_trait::async_trait;
use gridwatch_env::GridContext;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Seeded context on the tokio clock.
///
/// Every random stream is derived from one master seed, and wall time is
/// pinned to a fixed epoch plus logical time. Under a paused tokio runtime
/// (`#[tokio::test(start_paused = true)]`) sleeps complete instantly in
/// virtual time, so whole-grid runs are fast and repeatable.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,
    
    /// Logical time origin shared by every node
    start: Instant,
    
    /// Epoch offset (logical time 0 maps to this wall-clock time)
    epoch: SystemTime,
}

impl SimContext {
    /// Multiplier mixing the master seed before an extension is folded in.
    const SEED_MIX: u64 = 0x517cc1b727220a95;
    
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start: Instant::now(),
            epoch: UNIX_EPOCH + Duration::from_secs(1704067200), // 2024-01-01 00:00:00 UTC
        }
    }
    
    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }
    
    /// Seed for the stream identified by `extension`.
    pub fn derived_seed(&self, extension: u64) -> u64 {
        self.seed.wrapping_mul(Self::SEED_MIX) ^ extension
    }
}

#[async_trait]
impl GridContext for SimContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
    
    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }
    
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
    
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::trace!("spawning {}", name);
        tokio::spawn(future)
    }
    
    fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.derived_seed(seed_extension))
    }
    
    fn seed(&self) -> u64 {
        self.seed
    }
}
