//! Core environment context trait for GridWatch nodes.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that worker and aggregator
/// loops can run against wall-clock time in production and against a
/// seeded, virtual-time environment in tests.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, OS entropy
/// - **Simulation**: `SimContext` - same clock, `ChaCha8Rng(seed)`
///
/// # Shared clock origin
///
/// All nodes of one run share a single context, so `now()` is measured
/// from the same origin everywhere and round cadences stay phase-aligned.
#[async_trait]
pub trait GridContext: Send + Sync + 'static {
    /// Returns the logical clock: time elapsed since the run origin.
    fn now(&self) -> Duration;
    
    /// Returns the wall-clock time, used only for display.
    fn system_time(&self) -> SystemTime;
    
    /// Suspends execution for the given duration.
    async fn sleep(&self, duration: Duration);
    
    /// Spawns a background task and returns its join handle.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static;
    
    /// Derives a random number generator from a seed extension.
    ///
    /// Seeded implementations combine the master seed with `seed_extension`
    /// so every node gets a distinct but reproducible stream.
    fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng;
    
    /// Returns the context's seed (0 when not seeded).
    fn seed(&self) -> u64;
    
    /// Logical clock in seconds.
    fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }
    
    /// Wall clock as whole seconds since the Unix epoch.
    fn wall_secs(&self) -> i64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
    
    /// Sleeps until `interval` has elapsed since `round_start`.
    ///
    /// A round that already overran its interval does not sleep, it only
    /// yields to the scheduler. Returns the time actually slept.
    async fn sleep_until_interval(&self, round_start: Duration, interval: Duration) -> Duration {
        let remaining = remaining_in_interval(round_start, self.now(), interval);
        if remaining.is_zero() {
            tokio::task::yield_now().await;
        } else {
            self.sleep(remaining).await;
        }
        remaining
    }
}

/// Time left in the interval that started at `round_start`, clamped at zero.
pub fn remaining_in_interval(round_start: Duration, now: Duration, interval: Duration) -> Duration {
    (round_start + interval).saturating_sub(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_remaining_in_interval() {
        let start = Duration::from_millis(1000);
        let interval = Duration::from_millis(500);
        
        assert_eq!(
            remaining_in_interval(start, Duration::from_millis(1100), interval),
            Duration::from_millis(400)
        );
        assert_eq!(
            remaining_in_interval(start, Duration::from_millis(1500), interval),
            Duration::ZERO
        );
    }
    
    #[test]
    fn test_overrun_clamps_to_zero() {
        let remaining = remaining_in_interval(
            Duration::from_millis(0),
            Duration::from_millis(2500),
            Duration::from_millis(1000),
        );
        assert_eq!(remaining, Duration::ZERO);
    }
}
