//! tagtrust node - peers, the network registry and the simulation driver
//!
//! Ties the lower layers together:
//! - `Peer` owns one local view (stores, ledger, trust engine, aggregator)
//! - `Network` is the arena of peers, the driver-facing API and the gossip host
//! - `Simulation` advances the simulated clock, running gossip rounds and
//!   scenario actions
//! - `SimConfig` loads settings from TOML and `TAGTRUST_*` environment variables

pub mod config;
pub mod demo;
pub mod network;
pub mod peer;
pub mod scenario;
pub mod simulation;

pub use config::SimConfig;
pub use network::{Network, PeerSnapshot, RuleSnapshot, TagSnapshot};
pub use peer::{Peer, PeerSettings};
pub use scenario::{Command, ScenarioAction};
pub use simulation::{SimEvent, Simulation, SimulationReport};

use tagtrust_gossip::GossipError;
use tagtrust_protocol::{ContentId, PeerId, ProtocolError, TagKey};
use thiserror::Error;

/// Errors originating from peers, the registry or the simulation driver.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("Content {content} not found in the store of {peer}")]
    UnknownContent { peer: PeerId, content: ContentId },

    #[error("Tag {tag} not found in the store of {peer}")]
    UnknownTag { peer: PeerId, tag: TagKey },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Scheduling error: {0}")]
    Gossip(#[from] GossipError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
