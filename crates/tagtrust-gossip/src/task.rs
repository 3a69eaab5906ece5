//! One peer's gossip loop as an explicit phase machine.
//!
//! A round goes `Idle -> SelectingNeighbour -> Exchanging -> Ingesting -> Idle`.
//! `GossipTask::step` performs exactly one transition so drivers and tests can
//! observe every phase; `run_round` steps until the round completes. Sleeping
//! between rounds is the driver's business (re-enqueue on its scheduler).

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tagtrust_protocol::{PeerId, Vote};

/// Access to peers, as needed by a gossip round.
pub trait GossipHost {
    type Error;

    /// Neighbour ids of `peer`.
    fn neighbours(&self, peer: PeerId) -> Result<Vec<PeerId>, Self::Error>;

    /// Ask `from` for votes on behalf of `requester`, using `from`'s
    /// exchange policy.
    fn pull_votes(
        &mut self,
        from: PeerId,
        requester: PeerId,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vote>, Self::Error>;

    /// Hand `votes` to `peer` for processing. Returns how many were new.
    fn ingest_votes(
        &mut self,
        peer: PeerId,
        votes: Vec<Vote>,
        rng: &mut dyn RngCore,
    ) -> Result<usize, Self::Error>;
}

/// Where a gossip task is within its current round.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GossipPhase {
    #[default]
    Idle,
    SelectingNeighbour,
    Exchanging { neighbour: PeerId },
    Ingesting { neighbour: PeerId, votes: Vec<Vote> },
}

impl GossipPhase {
    pub fn name(&self) -> &'static str {
        match self {
            GossipPhase::Idle => "idle",
            GossipPhase::SelectingNeighbour => "selecting_neighbour",
            GossipPhase::Exchanging { .. } => "exchanging",
            GossipPhase::Ingesting { .. } => "ingesting",
        }
    }
}

/// Result of one completed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOutcome {
    pub peer: PeerId,
    /// `None` when the peer had no neighbour and the round was skipped.
    pub neighbour: Option<PeerId>,
    pub pulled: usize,
    pub ingested: usize,
}

/// Gossip state of a single peer.
#[derive(Debug, Clone)]
pub struct GossipTask {
    peer: PeerId,
    phase: GossipPhase,
    rounds: u64,
    skipped_rounds: u64,
    votes_ingested: u64,
}

impl GossipTask {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            phase: GossipPhase::Idle,
            rounds: 0,
            skipped_rounds: 0,
            votes_ingested: 0,
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn phase(&self) -> &GossipPhase {
        &self.phase
    }

    /// Completed rounds, skipped ones included.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn skipped_rounds(&self) -> u64 {
        self.skipped_rounds
    }

    pub fn votes_ingested(&self) -> u64 {
        self.votes_ingested
    }

    /// Perform one phase transition. Returns the outcome when this step
    /// finished the round.
    ///
    /// On a host error the task falls back to `Idle` and the round is lost.
    pub fn step<H: GossipHost>(
        &mut self,
        host: &mut H,
        rng: &mut dyn RngCore,
    ) -> Result<Option<ExchangeOutcome>, H::Error> {
        let phase = std::mem::take(&mut self.phase);
        match phase {
            GossipPhase::Idle => {
                self.phase = GossipPhase::SelectingNeighbour;
                Ok(None)
            }
            GossipPhase::SelectingNeighbour => {
                let neighbours = host.neighbours(self.peer)?;
                match neighbours.choose(rng) {
                    Some(neighbour) => {
                        self.phase = GossipPhase::Exchanging {
                            neighbour: *neighbour,
                        };
                        Ok(None)
                    }
                    None => {
                        self.rounds += 1;
                        self.skipped_rounds += 1;
                        tracing::debug!(peer = %self.peer, "No neighbours, skipping gossip round");
                        Ok(Some(ExchangeOutcome {
                            peer: self.peer,
                            neighbour: None,
                            pulled: 0,
                            ingested: 0,
                        }))
                    }
                }
            }
            GossipPhase::Exchanging { neighbour } => {
                let votes = host.pull_votes(neighbour, self.peer, rng)?;
                self.phase = GossipPhase::Ingesting { neighbour, votes };
                Ok(None)
            }
            GossipPhase::Ingesting { neighbour, votes } => {
                let pulled = votes.len();
                let ingested = host.ingest_votes(self.peer, votes, rng)?;
                self.rounds += 1;
                self.votes_ingested += ingested as u64;
                tracing::debug!(
                    peer = %self.peer,
                    neighbour = %neighbour,
                    pulled,
                    ingested,
                    "Gossip round complete"
                );
                Ok(Some(ExchangeOutcome {
                    peer: self.peer,
                    neighbour: Some(neighbour),
                    pulled,
                    ingested,
                }))
            }
        }
    }

    /// Run a full round from `Idle` back to `Idle`.
    pub fn run_round<H: GossipHost>(
        &mut self,
        host: &mut H,
        rng: &mut dyn RngCore,
    ) -> Result<ExchangeOutcome, H::Error> {
        loop {
            if let Some(outcome) = self.step(host, rng)? {
                return Ok(outcome);
            }
        }
    }
}
