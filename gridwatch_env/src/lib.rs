//! GridWatch Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction that lets the GridWatch
//! worker and aggregator loops run unchanged against real time or against a
//! seeded, virtual-time environment.
//!
//! # Intercepted I/O
//!
//! - Time (`now()`, `sleep()`, `sleep_until_interval()`)
//! - Task spawning (`spawn()`)
//! - Randomness (`derive_rng()`)
//! - Messaging (`Transport::send()`, `Transport::try_recv()`)
//!
//! # Example
//!
//! ```ignore
//! use gridwatch_env::{GridContext, Transport};
//!
//! async fn round_loop<Ctx: GridContext, Net: Transport>(ctx: &Ctx, net: &Net) {
//!     loop {
//!         let start = ctx.now();
//!         while let Ok(Some((from, envelope))) = net.try_recv() {
//!             handle(from, envelope);
//!         }
//!         ctx.sleep_until_interval(start, Duration::from_secs(1)).await;
//!     }
//! }
//! ```

mod context;
mod network;
mod types;
mod error;
mod tokio_impl;

pub use context::{GridContext, remaining_in_interval};
pub use network::Transport;
pub use types::{NodeId, Envelope};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
