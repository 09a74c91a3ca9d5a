//! Termination protocol: one-shot broadcast plus final rendezvous.

use std::sync::Arc;
use tokio::sync::{watch, Barrier};

/// Creates the aggregator's broadcast handle and the receive workers post.
pub fn channel() -> (TerminationBroadcast, TerminationReceiver) {
    let (tx, rx) = watch::channel(false);
    (TerminationBroadcast { tx }, TerminationReceiver { rx })
}

/// Held by the aggregator.
pub struct TerminationBroadcast {
    tx: watch::Sender<bool>,
}

impl TerminationBroadcast {
    /// Signals every worker. Calling it again has no effect.
    pub fn broadcast(&self) {
        self.tx.send_if_modified(|terminated| {
            let changed = !*terminated;
            *terminated = true;
            changed
        });
    }
    
    pub fn is_broadcast(&self) -> bool {
        *self.tx.borrow()
    }
}

/// A posted, pollable receive for the termination signal.
#[derive(Clone)]
pub struct TerminationReceiver {
    rx: watch::Receiver<bool>,
}

impl TerminationReceiver {
    /// Non-blocking test.
    ///
    /// A dropped broadcast handle counts as termination so workers never
    /// wait on an aggregator that is gone.
    pub fn poll(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }
}

/// Final point where every worker and the aggregator meet.
#[derive(Clone)]
pub struct Rendezvous {
    barrier: Arc<Barrier>,
}

impl Rendezvous {
    /// One slot per worker plus the aggregator.
    pub fn new(workers: usize) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(workers + 1)),
        }
    }
    
    pub async fn acknowledge(&self) {
        self.barrier.wait().await;
    }
}
