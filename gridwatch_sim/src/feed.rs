//! Background reference feed owned by the aggregator.

use gridwatch_core::{DetectionConfig, GridTopology, ReferenceRing, ReferenceSample};
use gridwatch_env::GridContext;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::trace;

/// State shared between the feed task and the aggregator loop.
pub struct FeedShared {
    ring: ReferenceRing,
    stop: AtomicBool,
    generated: AtomicU64,
}

impl FeedShared {
    pub fn ring(&self) -> &ReferenceRing {
        &self.ring
    }
    
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
    
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
    
    /// Samples written by the loop, not counting the pre-fill.
    pub fn samples_generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }
}

/// Handle to a running feed.
///
/// Dropping the handle without `stop_and_join` still stops the task.
pub struct ReferenceFeed {
    shared: Arc<FeedShared>,
    handle: Option<JoinHandle<()>>,
}

impl ReferenceFeed {
    /// Pre-fills the ring, then spawns the refresh loop.
    ///
    /// Pre-filling before the spawn means the aggregator never scans a slot
    /// the feed has not written.
    pub fn start<C: GridContext>(
        ctx: Arc<C>,
        topology: GridTopology,
        config: &DetectionConfig,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let max_reading = config.max_reading;
        let refresh = config.feed_interval();
        
        let ring = ReferenceRing::prefilled(config.feed_capacity, |_| {
            ReferenceSample::random(&mut rng, &topology, max_reading, ctx.now_secs(), ctx.wall_secs())
        });
        let shared = Arc::new(FeedShared {
            ring,
            stop: AtomicBool::new(false),
            generated: AtomicU64::new(0),
        });
        
        let task_shared = Arc::clone(&shared);
        let task_ctx = Arc::clone(&ctx);
        let handle = ctx.spawn("reference-feed", async move {
            while !task_shared.is_stopped() {
                let started = task_ctx.now();
                let sample = ReferenceSample::random(
                    &mut rng,
                    &topology,
                    max_reading,
                    task_ctx.now_secs(),
                    task_ctx.wall_secs(),
                );
                let slot = task_shared.ring.push(sample);
                task_shared.generated.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "feed slot {} <- {} at {} (t={:.3})",
                    slot, sample.reading, sample.position, sample.logical_time
                );
                
                task_ctx.sleep_until_interval(started, refresh).await;
            }
        });
        
        Self {
            shared,
            handle: Some(handle),
        }
    }
    
    pub fn ring(&self) -> &ReferenceRing {
        self.shared.ring()
    }
    
    pub fn shared(&self) -> &Arc<FeedShared> {
        &self.shared
    }
    
    pub fn samples_generated(&self) -> u64 {
        self.shared.samples_generated()
    }
    
    /// Sets the stop flag and waits for the task to finish its last iteration.
    pub async fn stop_and_join(mut self) -> Result<u64, tokio::task::JoinError> {
        self.shared.request_stop();
        if let Some(handle) = self.handle.take() {
            handle.await?;
        }
        Ok(self.shared.samples_generated())
    }
}

impl Drop for ReferenceFeed {
    fn drop(&mut self) {
        self.shared.request_stop();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
