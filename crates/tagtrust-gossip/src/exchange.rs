//! What a peer hands out when a neighbour asks for votes.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tagtrust_protocol::{PeerId, Vote, DEFAULT_EXCHANGE_BATCH_SIZE};
use tagtrust_state::VoteLedger;

/// Chooses the votes sent to a requesting neighbour.
pub trait ExchangePolicy: std::fmt::Debug {
    /// Votes from `ledger` to send to `requester`.
    fn select_votes(
        &self,
        ledger: &VoteLedger,
        requester: PeerId,
        rng: &mut dyn RngCore,
    ) -> Vec<Vote>;
}

/// Uniform random sample of up to `batch_size` votes, leaving out the
/// requester's own votes (it already has them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomExchangePolicy {
    pub batch_size: usize,
}

impl RandomExchangePolicy {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }
}

impl Default for RandomExchangePolicy {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_EXCHANGE_BATCH_SIZE,
        }
    }
}

impl ExchangePolicy for RandomExchangePolicy {
    fn select_votes(
        &self,
        ledger: &VoteLedger,
        requester: PeerId,
        rng: &mut dyn RngCore,
    ) -> Vec<Vote> {
        ledger.sample_random_votes(self.batch_size, Some(requester), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;
    use tagtrust_protocol::{ContentId, VoteId};

    fn vote(voter: u64, content: u64) -> Vote {
        Vote {
            voter: PeerId(voter),
            content_id: ContentId(content),
            tag_name: "t".into(),
            verdict: true,
            authors: BTreeSet::new(),
            rule_ids: BTreeSet::new(),
            linked_votes: [VoteId::GENESIS].into_iter().collect(),
        }
    }

    #[test]
    fn test_default_batch_size() {
        assert_eq!(RandomExchangePolicy::default().batch_size, 20);
    }

    #[test]
    fn test_requester_votes_excluded() {
        let mut ledger = VoteLedger::new();
        for content in 0..30 {
            ledger.add_vote(vote(1, content));
            ledger.add_vote(vote(2, content));
        }
        let policy = RandomExchangePolicy::new(8);
        let mut rng = StdRng::seed_from_u64(4);
        let votes = policy.select_votes(&ledger, PeerId(1), &mut rng);
        assert_eq!(votes.len(), 8);
        assert!(votes.iter().all(|v| v.voter == PeerId(2)));
    }
}
