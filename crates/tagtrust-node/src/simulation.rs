//! Discrete-event driver: gossip timers and scripted actions on one clock.
//!
//! Each peer's first gossip round fires at a random offset within one
//! exchange interval; after every round the peer sleeps for one interval by
//! re-enqueueing itself. Scripted actions fire at their timestamps. When the
//! clock reaches the configured duration, pending events are dropped and
//! (optionally) every peer recomputes its reputations.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tagtrust_gossip::{GossipTask, Scheduler, SimTime};
use tagtrust_protocol::{PeerId, PeerRole};

use crate::config::SimConfig;
use crate::network::{Network, PeerSnapshot};
use crate::scenario::ScenarioAction;
use crate::NodeError;

/// Something scheduled on the simulation clock.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Run one gossip round for the peer.
    Gossip(PeerId),
    /// Apply a scripted action.
    Action(ScenarioAction),
}

/// Counters and final peer views of a finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub end_time_secs: f64,
    pub gossip_rounds: u64,
    pub skipped_rounds: u64,
    pub votes_exchanged: u64,
    pub actions_applied: u64,
    pub actions_skipped: u64,
    pub dropped_events: usize,
    pub peers: Vec<PeerSnapshot>,
}

/// Owns the network, the clock and the simulation PRNG.
pub struct Simulation {
    network: Network,
    scheduler: Scheduler<SimEvent>,
    tasks: BTreeMap<PeerId, GossipTask>,
    rng: StdRng,
    seed: u64,
    interval_millis: u64,
    duration: SimTime,
    recompute_at_end: bool,
    started: bool,
    report: SimulationReport,
}

impl Simulation {
    pub fn new(network: Network, config: &SimConfig) -> Self {
        let seed = config.simulation.seed;
        Self {
            network,
            scheduler: Scheduler::new(),
            tasks: BTreeMap::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            interval_millis: config.exchange_interval_millis(),
            duration: SimTime::from_secs(config.simulation.duration_secs),
            recompute_at_end: config.simulation.recompute_at_end,
            started: false,
            report: SimulationReport::default(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// The simulation PRNG, for drivers that set up state before running.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn gossip_task(&self, peer: PeerId) -> Option<&GossipTask> {
        self.tasks.get(&peer)
    }

    /// Put a scripted action on the clock.
    pub fn schedule_action(&mut self, action: ScenarioAction) -> Result<(), NodeError> {
        let at = action.due_at();
        self.scheduler.schedule_at(at, SimEvent::Action(action))?;
        Ok(())
    }

    pub fn schedule_actions<I>(&mut self, actions: I) -> Result<(), NodeError>
    where
        I: IntoIterator<Item = ScenarioAction>,
    {
        for action in actions {
            self.schedule_action(action)?;
        }
        Ok(())
    }

    /// Start every peer's gossip timer at a random offset in `[0, interval]`.
    ///
    /// Called by `run` if the driver has not done so.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.start_idle_peers();
    }

    /// Register a peer mid-run. Its first gossip round fires within one
    /// interval from now. Returns false if the id is taken.
    pub fn add_peer(&mut self, id: PeerId, role: PeerRole) -> bool {
        if !self.network.add_peer(id, role) {
            return false;
        }
        if self.started {
            self.start_gossip(id);
        }
        true
    }

    /// Give every peer without a gossip task its first round. Covers peers
    /// added through `network_mut` after `start`.
    fn start_idle_peers(&mut self) {
        for peer in self.network.peer_ids() {
            if !self.tasks.contains_key(&peer) {
                self.start_gossip(peer);
            }
        }
    }

    fn start_gossip(&mut self, peer: PeerId) {
        self.tasks.insert(peer, GossipTask::new(peer));
        let offset = self.rng.gen_range(0..=self.interval_millis);
        self.scheduler
            .schedule_after(offset, SimEvent::Gossip(peer));
        tracing::debug!(
            peer = %peer,
            first_round = %self.scheduler.now().after_millis(offset),
            "Scheduled gossip"
        );
    }

    /// Run until the configured duration and report.
    pub fn run(&mut self) -> Result<SimulationReport, NodeError> {
        self.start();
        self.start_idle_peers();

        tracing::info!(
            seed = self.seed,
            peers = self.network.len(),
            duration = %self.duration,
            pending = self.scheduler.len(),
            "Starting simulation"
        );

        while let Some((at, event)) = self.scheduler.pop_until(self.duration) {
            match event {
                SimEvent::Gossip(peer) => self.run_gossip(peer)?,
                SimEvent::Action(action) => self.run_action(at, &action)?,
            }
        }

        self.scheduler.advance_to(self.duration);
        self.report.dropped_events = self.scheduler.clear();

        if self.recompute_at_end {
            self.network.recompute_all();
        }

        let mut report = self.report.clone();
        report.seed = self.seed;
        report.end_time_secs = self.scheduler.now().as_secs_f64();
        report.peers = self.network.snapshot();

        tracing::info!(
            end = %self.scheduler.now(),
            gossip_rounds = report.gossip_rounds,
            votes_exchanged = report.votes_exchanged,
            actions_applied = report.actions_applied,
            actions_skipped = report.actions_skipped,
            dropped_events = report.dropped_events,
            "Simulation finished"
        );
        Ok(report)
    }

    fn run_gossip(&mut self, peer: PeerId) -> Result<(), NodeError> {
        let Some(task) = self.tasks.get_mut(&peer) else {
            return Ok(());
        };
        let outcome = task.run_round(&mut self.network, &mut self.rng)?;

        self.report.gossip_rounds += 1;
        if outcome.neighbour.is_none() {
            self.report.skipped_rounds += 1;
        }
        self.report.votes_exchanged += outcome.ingested as u64;

        self.scheduler
            .schedule_after(self.interval_millis, SimEvent::Gossip(peer));
        Ok(())
    }

    /// Apply a scripted action. A vote on a tag the user has not learned
    /// about yet is skipped; anything else that fails aborts the run.
    fn run_action(&mut self, at: SimTime, action: &ScenarioAction) -> Result<(), NodeError> {
        match self.network.apply_action(action, &mut self.rng) {
            Ok(()) => {
                self.report.actions_applied += 1;
                Ok(())
            }
            Err(NodeError::UnknownTag { peer, tag }) => {
                tracing::warn!(
                    at = %at,
                    peer = %peer,
                    tag = %tag,
                    "Vote on a tag the peer does not know yet, skipping"
                );
                self.report.actions_skipped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
