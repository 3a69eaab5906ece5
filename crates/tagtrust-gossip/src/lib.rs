//! tagtrust gossip - epidemic vote dissemination on a simulated clock
//!
//! Each peer periodically pulls a random sample of votes from one random
//! neighbour:
//! - `Scheduler` is a discrete-event queue keyed by simulated time
//! - `ExchangePolicy` decides which votes a peer hands out when asked
//! - `GossipTask` walks one peer through a round, phase by phase
//! - `GossipHost` is the seam to whatever owns the peers

pub mod exchange;
pub mod scheduler;
pub mod task;

pub use exchange::{ExchangePolicy, RandomExchangePolicy};
pub use scheduler::{Scheduler, SimTime};
pub use task::{ExchangeOutcome, GossipHost, GossipPhase, GossipTask};

use thiserror::Error;

/// Errors originating from the gossip layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GossipError {
    #[error("Cannot schedule event at {at}: clock is already at {now}")]
    ScheduleInPast { at: SimTime, now: SimTime },
}
