//! Registry of peers and the driver-facing API.
//!
//! `Network` owns every peer in an ordered arena keyed by `PeerId`; peers
//! refer to each other by id only. Content and rules created through the
//! network are distributed to every peer, including peers added later.

use std::collections::BTreeMap;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tagtrust_gossip::GossipHost;
use tagtrust_protocol::{
    Content, ContentId, PeerId, PeerRole, ProtocolError, Rule, RuleId, RuleKind, TagKey, Vote,
    VoteId,
};

use crate::peer::{Peer, PeerSettings};
use crate::scenario::{Command, ScenarioAction};
use crate::NodeError;

/// Scores of one rule as seen by one peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub rule: RuleId,
    pub kind: RuleKind,
    pub reputation: f64,
}

/// Scores of one tag as seen by one peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub content: ContentId,
    pub name: String,
    pub reputation: f64,
    pub weight: f64,
}

/// Read-only summary of one peer's view, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSnapshot {
    pub peer: PeerId,
    pub role: PeerRole,
    pub neighbours: Vec<PeerId>,
    pub votes: usize,
    pub dag_edges: usize,
    pub tips: usize,
    pub similarity: BTreeMap<PeerId, f64>,
    pub flow: BTreeMap<PeerId, f64>,
    pub user_reputations: BTreeMap<PeerId, f64>,
    pub rules: Vec<RuleSnapshot>,
    pub tags: Vec<TagSnapshot>,
}

/// All peers plus the master copies of driver-created content and rules.
#[derive(Debug, Default)]
pub struct Network {
    peers: BTreeMap<PeerId, Peer>,
    corpus: BTreeMap<ContentId, f64>,
    rules: BTreeMap<RuleId, Rule>,
    settings: PeerSettings,
}

impl Network {
    pub fn new(settings: PeerSettings) -> Self {
        Self {
            peers: BTreeMap::new(),
            corpus: BTreeMap::new(),
            rules: BTreeMap::new(),
            settings,
        }
    }

    /// Register a peer. It receives every content item and rule created so
    /// far. Returns false if the id is taken.
    pub fn add_peer(&mut self, id: PeerId, role: PeerRole) -> bool {
        if self.peers.contains_key(&id) {
            return false;
        }
        let mut peer = Peer::new(id, role, &self.settings);
        for (content_id, popularity) in &self.corpus {
            peer.add_content(Content::new(*content_id, *popularity));
        }
        for rule in self.rules.values() {
            peer.add_rule(rule.clone());
        }
        self.peers.insert(id, peer);
        tracing::debug!(peer = %id, ?role, "Added peer");
        true
    }

    /// Create a content item and hand it to every peer.
    pub fn create_content(&mut self, id: ContentId, popularity: f64) -> Result<(), NodeError> {
        if !popularity.is_finite() || popularity < 0.0 {
            return Err(ProtocolError::InvalidPopularity(popularity).into());
        }
        self.corpus.insert(id, popularity);
        for peer in self.peers.values_mut() {
            peer.add_content(Content::new(id, popularity));
        }
        Ok(())
    }

    /// Create a rule, fix its applicable content against the current corpus
    /// and give every peer its own copy.
    pub fn create_rule(
        &mut self,
        id: RuleId,
        author: PeerId,
        output_tag: &str,
        coverage: f64,
        error_rate: f64,
        kind: RuleKind,
    ) -> Result<(), NodeError> {
        let mut rule = Rule::new(id, author, output_tag, coverage, error_rate, kind)?;
        let corpus: Vec<ContentId> = self.corpus.keys().copied().collect();
        rule.determine_applicable_content(&corpus);

        tracing::debug!(
            rule = %id,
            author = %author,
            tag = output_tag,
            correct = rule.applicable_correct.len(),
            incorrect = rule.applicable_incorrect.len(),
            "Created rule"
        );

        for peer in self.peers.values_mut() {
            peer.add_rule(rule.clone());
        }
        self.rules.insert(id, rule);
        Ok(())
    }

    pub fn apply_rules_to_content(&mut self, peer: PeerId) -> Result<usize, NodeError> {
        Ok(self.peer_mut(peer)?.apply_rules_to_content())
    }

    /// Apply rules on every peer. Returns the number of tags created.
    pub fn apply_rules_everywhere(&mut self) -> usize {
        self.peers
            .values_mut()
            .map(|peer| peer.apply_rules_to_content())
            .sum()
    }

    pub fn create_tag(
        &mut self,
        peer: PeerId,
        content_id: ContentId,
        name: &str,
    ) -> Result<bool, NodeError> {
        self.peer_mut(peer)?.create_tag(content_id, name)
    }

    pub fn vote<R: Rng + ?Sized>(
        &mut self,
        peer: PeerId,
        key: &TagKey,
        verdict: bool,
        rng: &mut R,
    ) -> Result<Option<VoteId>, NodeError> {
        self.peer_mut(peer)?.vote(key, verdict, rng)
    }

    /// Connect two peers in both directions.
    pub fn connect(&mut self, a: PeerId, b: PeerId) -> Result<(), NodeError> {
        if !self.peers.contains_key(&b) {
            return Err(NodeError::UnknownPeer(b));
        }
        self.peer_mut(a)?.connect(b);
        self.peer_mut(b)?.connect(a);
        Ok(())
    }

    /// Connect every pair of peers.
    pub fn connect_all(&mut self) {
        let ids: Vec<PeerId> = self.peers.keys().copied().collect();
        for peer in self.peers.values_mut() {
            for other in &ids {
                peer.connect(*other);
            }
        }
    }

    /// Run one scripted action.
    pub fn apply_action<R: Rng + ?Sized>(
        &mut self,
        action: &ScenarioAction,
        rng: &mut R,
    ) -> Result<(), NodeError> {
        match action.command {
            Command::Create => {
                self.create_tag(action.user_id, action.content_id, &action.tag_name)?;
            }
            Command::Vote => {
                self.vote(action.user_id, &action.tag_key(), action.is_upvote, rng)?;
            }
        }
        Ok(())
    }

    pub fn recompute_all(&mut self) {
        for peer in self.peers.values_mut() {
            peer.recompute_reputations();
        }
        tracing::info!(peers = self.peers.len(), "Recomputed reputations on all peers");
    }

    pub fn peer(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    fn peer_mut(&mut self, id: PeerId) -> Result<&mut Peer, NodeError> {
        self.peers.get_mut(&id).ok_or(NodeError::UnknownPeer(id))
    }

    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.keys().copied().collect()
    }

    /// Master copy of a rule as created by the driver.
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    pub fn content_ids(&self) -> Vec<ContentId> {
        self.corpus.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Reporting view of every peer.
    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        self.peers.values().map(snapshot_peer).collect()
    }
}

fn snapshot_peer(peer: &Peer) -> PeerSnapshot {
    let me = peer.id();
    let similarity = peer
        .trust()
        .similarity_matrix()
        .iter()
        .filter(|((a, _), _)| *a == me)
        .map(|((_, b), sim)| (*b, *sim))
        .collect();

    PeerSnapshot {
        peer: me,
        role: peer.role(),
        neighbours: peer.neighbours().to_vec(),
        votes: peer.ledger().len(),
        dag_edges: peer.ledger().dag_edges().len(),
        tips: peer.ledger().tips().len(),
        similarity,
        flow: peer.trust().flow_map().clone(),
        user_reputations: peer.user_reputations().clone(),
        rules: peer
            .rules()
            .iter()
            .map(|rule| RuleSnapshot {
                rule: rule.id,
                kind: rule.kind,
                reputation: rule.reputation_score,
            })
            .collect(),
        tags: peer
            .all_tags()
            .into_iter()
            .map(|tag| TagSnapshot {
                content: tag.key.content_id,
                name: tag.key.name.clone(),
                reputation: tag.reputation_score,
                weight: tag.weight,
            })
            .collect(),
    }
}

impl GossipHost for Network {
    type Error = NodeError;

    fn neighbours(&self, peer: PeerId) -> Result<Vec<PeerId>, NodeError> {
        self.peers
            .get(&peer)
            .map(|p| p.neighbours().to_vec())
            .ok_or(NodeError::UnknownPeer(peer))
    }

    fn pull_votes(
        &mut self,
        from: PeerId,
        requester: PeerId,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vote>, NodeError> {
        let peer = self.peers.get(&from).ok_or(NodeError::UnknownPeer(from))?;
        Ok(peer.sample_random_votes(requester, rng))
    }

    fn ingest_votes(
        &mut self,
        peer: PeerId,
        votes: Vec<Vote>,
        rng: &mut dyn RngCore,
    ) -> Result<usize, NodeError> {
        self.peer_mut(peer)?.process_incoming_votes(votes, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_late_peer_receives_content_and_rules() {
        let mut network = Network::default();
        network.add_peer(PeerId(1), PeerRole::Honest);
        network.create_content(ContentId(1), 0.5).unwrap();
        network
            .create_rule(RuleId(1), PeerId(1), "auto", 1.0, 0.0, RuleKind::Accurate)
            .unwrap();
        network.add_peer(PeerId(2), PeerRole::Honest);

        let late = network.peer(PeerId(2)).unwrap();
        assert!(late.content().contains(ContentId(1)));
        assert!(late.rules().get(RuleId(1)).is_some());
        assert!(!network.add_peer(PeerId(2), PeerRole::RandomVoter));
    }

    #[test]
    fn test_invalid_popularity_rejected() {
        let mut network = Network::default();
        assert!(matches!(
            network.create_content(ContentId(1), -1.0),
            Err(NodeError::Protocol(ProtocolError::InvalidPopularity(_)))
        ));
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let mut network = Network::default();
        assert!(matches!(
            network.create_rule(RuleId(1), PeerId(1), "x", 0.5, 2.0, RuleKind::Spam),
            Err(NodeError::Protocol(ProtocolError::InvalidRule { .. }))
        ));
    }

    #[test]
    fn test_connect_is_symmetric() {
        let mut network = Network::default();
        network.add_peer(PeerId(1), PeerRole::Honest);
        network.add_peer(PeerId(2), PeerRole::Honest);
        network.connect(PeerId(1), PeerId(2)).unwrap();
        assert_eq!(network.neighbours(PeerId(1)).unwrap(), vec![PeerId(2)]);
        assert_eq!(network.neighbours(PeerId(2)).unwrap(), vec![PeerId(1)]);
        assert!(matches!(
            network.connect(PeerId(1), PeerId(5)),
            Err(NodeError::UnknownPeer(PeerId(5)))
        ));
    }

    #[test]
    fn test_vote_for_unknown_peer() {
        let mut network = Network::default();
        let mut rng = StdRng::seed_from_u64(0);
        let key = TagKey::new(ContentId(1), "x");
        assert!(matches!(
            network.vote(PeerId(1), &key, true, &mut rng),
            Err(NodeError::UnknownPeer(_))
        ));
    }
}
