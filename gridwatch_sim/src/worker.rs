//! Worker node: the per-round sensing loop.

use crate::error::SimError;
use crate::exchange::{NeighborExchange, RoundBarrier};
use crate::termination::{Rendezvous, TerminationReceiver};
use gridwatch_core::{
    detect, DetectionConfig, GridPosition, Reading, ReadingSource, RoundObservation,
};
use gridwatch_env::{Envelope, GridContext, NodeId, Transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Running,
    
    /// Termination observed, final rendezvous pending
    Draining,
    
    Stopped,
}

/// What a worker reports back once it has stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub rank: NodeId,
    pub position: GridPosition,
    pub rounds: u32,
    pub reports_sent: u64,
    pub state: WorkerState,
}

/// Collective handles every worker holds.
#[derive(Clone)]
pub struct WorkerLinks {
    pub barrier: RoundBarrier,
    pub termination: TerminationReceiver,
    pub rendezvous: Rendezvous,
    pub aggregator: NodeId,
}

pub struct Worker<C: GridContext, T: Transport> {
    ctx: Arc<C>,
    transport: T,
    config: Arc<DetectionConfig>,
    position: GridPosition,
    source: Box<dyn ReadingSource>,
    exchange: NeighborExchange,
    links: WorkerLinks,
    state: WorkerState,
    rounds: u32,
    reports_sent: u64,
}

impl<C: GridContext, T: Transport> Worker<C, T> {
    pub fn new(
        ctx: Arc<C>,
        transport: T,
        config: Arc<DetectionConfig>,
        position: GridPosition,
        exchange: NeighborExchange,
        source: Box<dyn ReadingSource>,
        links: WorkerLinks,
    ) -> Self {
        Self {
            ctx,
            transport,
            config,
            position,
            source,
            exchange,
            links,
            state: WorkerState::Running,
            rounds: 0,
            reports_sent: 0,
        }
    }
    
    pub fn id(&self) -> NodeId {
        self.transport.local_id()
    }
    
    pub fn state(&self) -> WorkerState {
        self.state
    }
    
    /// Runs rounds until the group agrees to stop, then meets the aggregator.
    pub async fn run(mut self) -> Result<WorkerSummary, SimError> {
        let interval = self.config.interval();
        
        while self.state == WorkerState::Running {
            let round_start = self.ctx.now();
            self.run_round().await?;
            self.rounds += 1;
            
            let remaining = self.ctx.sleep_until_interval(round_start, interval).await;
            if remaining.is_zero() {
                warn!("Rank {} overran round {}", self.id(), self.rounds - 1);
            }
            
            let observed = self.links.termination.poll();
            if self.links.barrier.sync_round(observed).await {
                self.state = WorkerState::Draining;
            }
        }
        
        self.links.rendezvous.acknowledge().await;
        self.state = WorkerState::Stopped;
        info!("Rank {} {} exiting", self.id(), self.position);
        
        Ok(WorkerSummary {
            rank: self.id(),
            position: self.position,
            rounds: self.rounds,
            reports_sent: self.reports_sent,
            state: self.state,
        })
    }
    
    async fn run_round(&mut self) -> Result<(), SimError> {
        let round = self.rounds;
        let value = self.source.next_value();
        
        let timestamp_ms = u64::try_from(self.ctx.now().as_millis()).unwrap_or(u64::MAX);
        let readings = self
            .exchange
            .all_gather(&self.transport, round, value, timestamp_ms)
            .await?;
        
        // Stamped after the exchange so the report carries its send time.
        let observation = RoundObservation {
            round,
            origin: self.id(),
            position: self.position,
            reading: Reading::new(value, self.ctx.now_secs(), self.ctx.wall_secs()),
        };
        
        let Some(report) = detect(&observation, self.exchange.neighbors(), &readings, &self.config) else {
            return Ok(());
        };
        
        debug!(
            "Rank {} round {}: reading {} with {} matching neighbours, reporting",
            self.id(),
            round,
            value,
            report.matching_neighbours()
        );
        let payload = report.encode()?;
        self.transport
            .send(self.links.aggregator, Envelope::new(payload, timestamp_ms))?;
        self.reports_sent += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::network::SimNetwork;
    use crate::termination;
    use gridwatch_core::{GridTopology, Report, ScriptedReadings};
    use std::time::Duration;
    
    #[tokio::test(start_paused = true)]
    async fn test_single_column_reports_and_stops() {
        // 3 x 1 grid: the middle worker has two neighbours.
        let ctx = SimContext::shared(5);
        let topology = GridTopology::new(3, 1).unwrap();
        let config = Arc::new(DetectionConfig::default());
        let mut networks = SimNetwork::mesh(topology.participant_count());
        let aggregator_net = networks.pop().unwrap();
        
        let (broadcast, receiver) = termination::channel();
        let links = WorkerLinks {
            barrier: RoundBarrier::new(topology.worker_count()),
            termination: receiver,
            rendezvous: Rendezvous::new(topology.worker_count()),
            aggregator: topology.aggregator_id(),
        };
        
        let mut handles = Vec::new();
        for network in networks {
            let id = network.local_id();
            let worker = Worker::new(
                Arc::clone(&ctx),
                network,
                Arc::clone(&config),
                topology.position_of(id).unwrap(),
                NeighborExchange::new(topology.neighbors(id)),
                Box::new(ScriptedReadings::constant(90)),
                links.clone(),
            );
            assert_eq!(worker.state(), WorkerState::Running);
            handles.push(tokio::spawn(worker.run()));
        }
        
        ctx.sleep(Duration::from_millis(2500)).await;
        broadcast.broadcast();
        links.rendezvous.acknowledge().await;
        
        let mut summaries = Vec::new();
        for handle in handles {
            summaries.push(handle.await.unwrap().unwrap());
        }
        
        let rounds = summaries[0].rounds;
        assert_eq!(rounds, 3);
        for summary in &summaries {
            assert_eq!(summary.rounds, rounds);
            assert_eq!(summary.state, WorkerState::Stopped);
        }
        
        // Only the middle worker has two corroborating neighbours.
        assert_eq!(summaries[0].reports_sent, 0);
        assert_eq!(summaries[1].reports_sent, u64::from(rounds));
        assert_eq!(summaries[2].reports_sent, 0);
        
        let mut received = 0;
        while let Some((from, envelope)) = aggregator_net.try_recv().unwrap() {
            let report = Report::decode(&envelope.payload).unwrap();
            assert_eq!(from, NodeId(1));
            assert_eq!(report.origin, NodeId(1));
            assert_eq!(report.round, received);
            assert_eq!(report.matching_neighbours(), 2);
            received += 1;
        }
        assert_eq!(received, rounds);
    }
}
