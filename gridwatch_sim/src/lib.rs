//! GridWatch simulation runtime
//!
//! Runs a `rows x cols` sensor grid plus one aggregator inside a single
//! process. Each participant is a tokio task; they talk only through an
//! in-process fabric that offers the primitives the protocol needs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         GridRunner                           │
//! │                                                              │
//! │  ┌────────┐ all-gather ┌────────┐                            │
//! │  │ Worker │◄──────────►│ Worker │  ...  (rows x cols)        │
//! │  │ rank 0 │            │ rank 1 │                            │
//! │  └───┬────┘            └───┬────┘                            │
//! │      │   RoundBarrier      │                                 │
//! │      │   reports (buffered, fire-and-forget)                 │
//! │      ▼                     ▼                                 │
//! │  ┌──────────────────────────────────┐    ┌────────────────┐  │
//! │  │ Aggregator (last rank)           │◄───│ ReferenceFeed  │  │
//! │  │ drain → cross-validate → log     │ring│ (background)   │  │
//! │  └──────────────────────────────────┘    └────────────────┘  │
//! │      │ termination broadcast + final rendezvous              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gridwatch_sim::{GridRunner, SimConfig};
//!
//! let config = SimConfig::default().with_grid(4, 5);
//! let outcome = GridRunner::seeded(config).run().await?;
//! println!("{}", outcome.summary);
//! ```

mod aggregator;
mod context;
mod error;
mod event_log;
mod exchange;
mod feed;
mod network;
mod runner;
mod stop;
pub mod termination;
mod worker;

pub use aggregator::{Aggregator, AggregatorOutcome};
pub use context::SimContext;
pub use error::SimError;
pub use event_log::{format_wall, EventLog, EventRecord, DEFAULT_LOG_FILE};
pub use exchange::{NeighborExchange, RoundBarrier};
pub use feed::{FeedShared, ReferenceFeed};
pub use network::SimNetwork;
pub use runner::{GridRunner, ReadingPlan, RunOutcome, SimConfig};
pub use stop::{StopCondition, StopSignal, DEFAULT_SENTINEL};
pub use worker::{Worker, WorkerLinks, WorkerState, WorkerSummary};
