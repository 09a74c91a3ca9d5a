//! Aggregator node: drains reports, cross-validates them, ends the run.

use crate::error::SimError;
use crate::event_log::{EventLog, EventRecord};
use crate::feed::ReferenceFeed;
use crate::stop::StopCondition;
use crate::termination::{Rendezvous, TerminationBroadcast};
use gridwatch_core::{
    cross_validate, DetectionConfig, GridTopology, Report, RunStatistics, RunSummary,
};
use gridwatch_env::{EnvError, GridContext, Transport};
use std::sync::Arc;
use tracing::debug;

/// Result of a finished aggregator.
pub struct AggregatorOutcome {
    pub summary: RunSummary,
    pub events: Vec<EventRecord>,
    pub samples_generated: u64,
}

pub struct Aggregator<C: GridContext, T: Transport> {
    ctx: Arc<C>,
    transport: T,
    topology: GridTopology,
    config: Arc<DetectionConfig>,
    stop: StopCondition,
    termination: TerminationBroadcast,
    rendezvous: Rendezvous,
    log: EventLog,
}

impl<C: GridContext, T: Transport> Aggregator<C, T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: Arc<C>,
        transport: T,
        topology: GridTopology,
        config: Arc<DetectionConfig>,
        stop: StopCondition,
        termination: TerminationBroadcast,
        rendezvous: Rendezvous,
        log: EventLog,
    ) -> Self {
        Self {
            ctx,
            transport,
            topology,
            config,
            stop,
            termination,
            rendezvous,
            log,
        }
    }
    
    pub async fn run(mut self) -> Result<AggregatorOutcome, SimError> {
        let interval = self.config.interval();
        let mut stats = RunStatistics::new(self.ctx.now());
        self.log.banner(self.ctx.wall_secs(), &self.topology)?;
        
        let rng = self.ctx.derive_rng(u64::from(self.topology.aggregator_id().0));
        let feed = ReferenceFeed::start(Arc::clone(&self.ctx), self.topology, &self.config, rng);
        
        let mut round = 0u32;
        let reason = loop {
            let round_start = self.ctx.now();
            if let Some(reason) = self.stop.evaluate(round) {
                break reason;
            }
            
            let drained = self.drain(round, &feed, &mut stats)?;
            debug!("Aggregator round {}: {} reports", round, drained);
            stats.complete_round();
            
            self.ctx.sleep_until_interval(round_start, interval).await;
            round += 1;
        };
        
        self.termination.broadcast();
        
        // Every worker has acknowledged, so nothing more can be sent.
        self.rendezvous.acknowledge().await;
        let drained = self.drain(round, &feed, &mut stats)?;
        debug!("Aggregator final drain: {} reports", drained);
        
        let samples_generated = feed.stop_and_join().await?;
        let summary = stats.finalize(self.ctx.now(), reason);
        self.log.finish(reason, &summary)?;
        
        Ok(AggregatorOutcome {
            summary,
            events: self.log.into_records(),
            samples_generated,
        })
    }
    
    /// Classifies every report already queued. Never suspends.
    fn drain(
        &mut self,
        round: u32,
        feed: &ReferenceFeed,
        stats: &mut RunStatistics,
    ) -> Result<usize, SimError> {
        let mut drained = 0;
        
        while let Some((from, envelope)) = self.transport.try_recv()? {
            let received_at = self.ctx.now_secs();
            let report = Report::decode(&envelope.payload)?;
            if report.origin != from {
                return Err(EnvError::protocol(format!(
                    "report from {} claims origin {}",
                    from, report.origin
                ))
                .into());
            }
            
            let classification = cross_validate(&report, feed.ring(), &self.config);
            stats.record(&classification);
            self.log.append(EventRecord::new(
                round,
                self.ctx.wall_secs(),
                received_at,
                &report,
                classification,
            ))?;
            drained += 1;
        }
        
        Ok(drained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::network::SimNetwork;
    use crate::stop::StopSignal;
    use crate::termination;
    use gridwatch_core::{Corroborators, GridPosition, RoundLimit, StopReason};
    use gridwatch_env::{Envelope, NodeId};
    use std::time::Duration;
    
    fn report(origin: NodeId, round: u32) -> Report {
        Report {
            round,
            origin,
            position: GridPosition::new(0, 0),
            reading: 95,
            logical_time: 0.0,
            wall_time: 0,
            corroborators: Corroborators::new(),
        }
    }
    
    fn aggregator(
        ctx: &Arc<SimContext>,
        transport: SimNetwork,
        limit: RoundLimit,
    ) -> (Aggregator<SimContext, SimNetwork>, termination::TerminationReceiver, Rendezvous) {
        let topology = GridTopology::new(1, 1).unwrap();
        let (broadcast, receiver) = termination::channel();
        let rendezvous = Rendezvous::new(topology.worker_count());
        let aggregator = Aggregator::new(
            Arc::clone(ctx),
            transport,
            topology,
            Arc::new(DetectionConfig::default()),
            StopCondition::new(limit, StopSignal::Never),
            broadcast,
            rendezvous.clone(),
            EventLog::disabled().retaining(),
        );
        (aggregator, receiver, rendezvous)
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_reports_classified_including_final_drain() {
        let ctx = SimContext::shared(11);
        let mut networks = SimNetwork::mesh(2);
        let aggregator_net = networks.pop().unwrap();
        let worker_net = networks.pop().unwrap();
        
        let (aggregator, receiver, rendezvous) = aggregator(&ctx, aggregator_net, RoundLimit::Bounded(2));
        
        worker_net
            .send(NodeId(1), Envelope::new(report(NodeId(0), 0).encode().unwrap(), 0))
            .unwrap();
        let handle = tokio::spawn(aggregator.run());
        
        // Wait for the broadcast, then send one more before acknowledging.
        while !receiver.poll() {
            ctx.sleep(Duration::from_millis(100)).await;
        }
        worker_net
            .send(NodeId(1), Envelope::new(report(NodeId(0), 2).encode().unwrap(), 0))
            .unwrap();
        rendezvous.acknowledge().await;
        
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.summary.reason, StopReason::RoundLimit(2));
        assert_eq!(outcome.summary.rounds, 2);
        assert_eq!(outcome.summary.total_events(), 2);
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.events[0].aggregator_round, 0);
        assert_eq!(outcome.events[1].report_round, 2);
        assert!(outcome.samples_generated > 0);
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_spoofed_origin_is_rejected() {
        let ctx = SimContext::shared(12);
        let mut networks = SimNetwork::mesh(2);
        let aggregator_net = networks.pop().unwrap();
        let worker_net = networks.pop().unwrap();
        
        let (aggregator, _receiver, _rendezvous) = aggregator(&ctx, aggregator_net, RoundLimit::Bounded(5));
        worker_net
            .send(NodeId(1), Envelope::new(report(NodeId(7), 0).encode().unwrap(), 0))
            .unwrap();
        
        let result = aggregator.run().await;
        assert!(matches!(result, Err(SimError::Transport(EnvError::ProtocolError(_)))));
    }
}
