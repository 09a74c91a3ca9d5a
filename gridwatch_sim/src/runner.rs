//! GridRunner - wires the fabric, spawns every node, and collects the outcome.

use crate::aggregator::Aggregator;
use crate::context::SimContext;
use crate::error::SimError;
use crate::event_log::{EventLog, EventRecord, DEFAULT_LOG_FILE};
use crate::exchange::{NeighborExchange, RoundBarrier};
use crate::network::SimNetwork;
use crate::stop::{StopCondition, StopSignal};
use crate::termination::{self, Rendezvous};
use crate::worker::{Worker, WorkerLinks, WorkerSummary};
use gridwatch_core::{
    DetectionConfig, GridTopology, RandomReadings, ReadingSource, RoundLimit, RunSummary,
    ScriptedReadings,
};
use gridwatch_env::{EnvError, GridContext, Transport};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Where worker readings come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadingPlan {
    /// Uniform in `0..=max_reading`, seeded per rank
    Random,
    
    /// Every worker reads the same value every round
    Constant(i32),
    
    /// Every worker cycles through the same list
    Scripted(Vec<i32>),
}

impl ReadingPlan {
    fn source(&self, rng: ChaCha8Rng, max_reading: i32) -> Box<dyn ReadingSource> {
        match self {
            ReadingPlan::Random => Box::new(RandomReadings::new(rng, max_reading)),
            ReadingPlan::Constant(value) => Box::new(ScriptedReadings::constant(*value)),
            ReadingPlan::Scripted(values) => Box::new(ScriptedReadings::new(values.clone())),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Grid rows (validated when the run starts)
    pub rows: i64,
    
    /// Grid columns
    pub cols: i64,
    
    /// Expected participant count, checked against `rows * cols + 1`
    pub participants: Option<usize>,
    
    pub round_limit: RoundLimit,
    
    /// External stop request polled by the aggregator
    #[serde(skip)]
    pub stop: StopSignal,
    
    /// Master seed for determinism
    pub seed: u64,
    
    pub detection: DetectionConfig,
    
    pub readings: ReadingPlan,
    
    /// Event log file; `None` disables it
    pub event_log: Option<PathBuf>,
    
    /// Keep every event record in the outcome
    pub retain_events: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            participants: None,
            round_limit: RoundLimit::Bounded(10),
            stop: StopSignal::default(),
            seed: 42,
            detection: DetectionConfig::default(),
            readings: ReadingPlan::Random,
            event_log: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            retain_events: false,
        }
    }
}

impl SimConfig {
    pub fn with_grid(mut self, rows: i64, cols: i64) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }
    
    pub fn with_participants(mut self, participants: usize) -> Self {
        self.participants = Some(participants);
        self
    }
    
    pub fn with_round_limit(mut self, limit: RoundLimit) -> Self {
        self.round_limit = limit;
        self
    }
    
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }
    
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    
    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }
    
    pub fn with_readings(mut self, readings: ReadingPlan) -> Self {
        self.readings = readings;
        self
    }
    
    pub fn with_event_log(mut self, path: Option<PathBuf>) -> Self {
        self.event_log = path;
        self
    }
    
    pub fn retaining_events(mut self) -> Self {
        self.retain_events = true;
        self
    }
    
    /// Validates everything that must hold before any node runs.
    pub fn topology(&self) -> Result<GridTopology, SimError> {
        let topology = match self.participants {
            Some(participants) => GridTopology::for_participants(self.rows, self.cols, participants)?,
            None => GridTopology::new(self.rows, self.cols)?,
        };
        self.detection.validate()?;
        Ok(topology)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub summary: RunSummary,
    
    /// One entry per worker, ordered by rank
    pub workers: Vec<WorkerSummary>,
    
    /// Classified reports (empty unless events were retained)
    pub events: Vec<EventRecord>,
    
    pub samples_generated: u64,
}

impl RunOutcome {
    /// Reports sent by all workers together.
    pub fn reports_sent(&self) -> u64 {
        self.workers.iter().map(|w| w.reports_sent).sum()
    }
}

/// Runs one grid to completion.
pub struct GridRunner<C: GridContext> {
    ctx: Arc<C>,
    config: SimConfig,
}

impl GridRunner<SimContext> {
    /// Runner on a context seeded from `config.seed`.
    pub fn seeded(config: SimConfig) -> Self {
        let ctx = SimContext::shared(config.seed);
        Self::new(ctx, config)
    }
}

impl<C: GridContext> GridRunner<C> {
    pub fn new(ctx: Arc<C>, config: SimConfig) -> Self {
        Self { ctx, config }
    }
    
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
    
    pub async fn run(self) -> Result<RunOutcome, SimError> {
        let topology = self.config.topology()?;
        let detection = Arc::new(self.config.detection.clone());
        
        let mut log = match &self.config.event_log {
            Some(path) => EventLog::create(path)?,
            None => EventLog::disabled(),
        };
        if self.config.retain_events {
            log = log.retaining();
        }
        
        info!(
            "Running {}x{} grid ({} workers + aggregator), {}, seed {}",
            topology.rows(),
            topology.cols(),
            topology.worker_count(),
            self.config.round_limit,
            self.ctx.seed()
        );
        
        let mut networks = SimNetwork::mesh(topology.participant_count());
        let aggregator_net = networks
            .pop()
            .ok_or_else(|| EnvError::network("fabric has no participants"))?;
        
        let (broadcast, receiver) = termination::channel();
        let links = WorkerLinks {
            barrier: RoundBarrier::new(topology.worker_count()),
            termination: receiver,
            rendezvous: Rendezvous::new(topology.worker_count()),
            aggregator: topology.aggregator_id(),
        };
        
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(networks.len());
        for network in networks {
            let id = network.local_id();
            let position = topology.position_of(id).ok_or_else(|| EnvError::unreachable(id))?;
            let source = self
                .config
                .readings
                .source(self.ctx.derive_rng(u64::from(id.0)), detection.max_reading);
            
            let worker = Worker::new(
                Arc::clone(&self.ctx),
                network,
                Arc::clone(&detection),
                position,
                NeighborExchange::new(topology.neighbors(id)),
                source,
                links.clone(),
            );
            let tx = result_tx.clone();
            handles.push(self.ctx.spawn(&format!("worker-{}", id), async move {
                let _ = tx.send(worker.run().await);
            }));
        }
        drop(result_tx);
        
        let aggregator = Aggregator::new(
            Arc::clone(&self.ctx),
            aggregator_net,
            topology,
            detection,
            StopCondition::new(self.config.round_limit, self.config.stop.clone()),
            broadcast,
            links.rendezvous,
            log,
        );
        let aggregator_run = aggregator.run();
        tokio::pin!(aggregator_run);
        
        let mut workers = Vec::with_capacity(handles.len());
        let outcome = loop {
            tokio::select! {
                result = &mut aggregator_run => break result,
                Some(result) = result_rx.recv() => match result {
                    Ok(summary) => workers.push(summary),
                    Err(err) => {
                        error!("Worker failed: {}", err);
                        handles.iter().for_each(|handle| handle.abort());
                        return Err(err);
                    }
                },
            }
        };
        
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Aggregator failed: {}", err);
                handles.iter().for_each(|handle| handle.abort());
                return Err(err);
            }
        };
        
        for handle in handles {
            handle.await?;
        }
        while let Some(result) = result_rx.recv().await {
            workers.push(result?);
        }
        workers.sort_by_key(|w| w.rank);
        
        Ok(RunOutcome {
            summary: outcome.summary,
            workers,
            events: outcome.events,
            samples_generated: outcome.samples_generated,
        })
    }
}
