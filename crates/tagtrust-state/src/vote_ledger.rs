//! Append-only vote ledger with a causal vote DAG.
//!
//! Every peer keeps its own ledger holding the votes it cast and the votes
//! it received through gossip:
//! - Votes are deduplicated by identity `(voter, content, tag)`
//! - Lookup indices by voter, by content and by tag (one vote per voter)
//! - Each vote links to 0..k earlier "tips" (votes nothing references yet),
//!   forming a DAG rooted at a genesis node
//!
//! The DAG is provenance scaffolding. Nothing is derived from its shape
//! apart from tip selection for new votes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::seq::SliceRandom;
use rand::Rng;
use tagtrust_protocol::{ContentId, PeerId, TagKey, Vote, VoteId};

/// A node in the vote DAG.
///
/// Parents referenced by a vote may not have arrived yet; they exist as
/// nodes without a vote record until (if ever) the vote shows up.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Outgoing edges: the votes this node links to.
    parents: BTreeSet<VoteId>,
    /// Number of later votes linking to this node.
    in_degree: usize,
}

/// Deduplicated store of votes plus the vote DAG.
#[derive(Debug, Clone)]
pub struct VoteLedger {
    votes: HashMap<VoteId, Vote>,
    /// Insertion order, used for deterministic sampling.
    order: Vec<VoteId>,
    by_voter: BTreeMap<PeerId, Vec<VoteId>>,
    by_content: BTreeMap<ContentId, Vec<VoteId>>,
    by_tag: HashMap<TagKey, BTreeMap<PeerId, VoteId>>,
    dag: HashMap<VoteId, DagNode>,
    /// Nodes with zero incoming edges.
    tips: BTreeSet<VoteId>,
}

impl VoteLedger {
    /// Create an empty ledger whose DAG holds only the genesis node.
    pub fn new() -> Self {
        let mut dag = HashMap::new();
        dag.insert(VoteId::GENESIS, DagNode::default());
        let mut tips = BTreeSet::new();
        tips.insert(VoteId::GENESIS);
        Self {
            votes: HashMap::new(),
            order: Vec::new(),
            by_voter: BTreeMap::new(),
            by_content: BTreeMap::new(),
            by_tag: HashMap::new(),
            dag,
            tips,
        }
    }

    pub fn has_vote(&self, vote: &Vote) -> bool {
        self.votes.contains_key(&vote.id())
    }

    pub fn get(&self, id: &VoteId) -> Option<&Vote> {
        self.votes.get(id)
    }

    /// Insert a vote. Returns false, leaving every index untouched, if a vote
    /// with the same identity is already stored.
    pub fn add_vote(&mut self, vote: Vote) -> bool {
        let id = vote.id();
        if self.votes.contains_key(&id) {
            return false;
        }

        self.order.push(id);
        self.by_voter.entry(vote.voter).or_default().push(id);
        self.by_content.entry(vote.content_id).or_default().push(id);
        self.by_tag
            .entry(vote.tag_key())
            .or_default()
            .insert(vote.voter, id);

        self.link(id, &vote.linked_votes);

        tracing::debug!(
            vote = %id,
            voter = %vote.voter,
            content = %vote.content_id,
            tag = %vote.tag_name,
            verdict = vote.verdict,
            parents = vote.linked_votes.len(),
            "Added vote to ledger"
        );

        self.votes.insert(id, vote);
        true
    }

    /// Add the DAG node for `id` and its edges to `parents`.
    fn link(&mut self, id: VoteId, parents: &BTreeSet<VoteId>) {
        for parent in parents {
            if *parent == id {
                continue;
            }
            let node = self.dag.entry(*parent).or_default();
            node.in_degree += 1;
            self.tips.remove(parent);
        }

        let node = self.dag.entry(id).or_default();
        node.parents.extend(parents.iter().filter(|p| **p != id).copied());
        if node.in_degree == 0 {
            self.tips.insert(id);
        }
    }

    /// Add a batch of votes in order.
    ///
    /// Processing stops at the first vote that is already known: the rest of
    /// the batch is assumed to be known as well. Returns how many votes were
    /// added.
    pub fn add_votes<I>(&mut self, votes: I) -> usize
    where
        I: IntoIterator<Item = Vote>,
    {
        let mut added = 0;
        for vote in votes {
            if self.has_vote(&vote) {
                break;
            }
            if self.add_vote(vote) {
                added += 1;
            }
        }
        added
    }

    /// Votes cast by `voter`, in arrival order.
    pub fn votes_for_user(&self, voter: PeerId) -> Vec<&Vote> {
        self.resolve(self.by_voter.get(&voter))
    }

    /// Votes on any tag of `content_id`, in arrival order.
    pub fn votes_for_content(&self, content_id: ContentId) -> Vec<&Vote> {
        self.resolve(self.by_content.get(&content_id))
    }

    /// The one stored vote per distinct voter on `key`, ordered by voter.
    pub fn votes_for_tag(&self, key: &TagKey) -> Vec<&Vote> {
        self.by_tag
            .get(key)
            .map(|voters| voters.values().filter_map(|id| self.votes.get(id)).collect())
            .unwrap_or_default()
    }

    fn resolve(&self, ids: Option<&Vec<VoteId>>) -> Vec<&Vote> {
        ids.map(|ids| ids.iter().filter_map(|id| self.votes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Whether `voter` already has a vote on `(content_id, tag_name)` here.
    pub fn has_user_voted_on_tag(
        &self,
        voter: PeerId,
        content_id: ContentId,
        tag_name: &str,
    ) -> bool {
        self.votes
            .contains_key(&VoteId::compute(voter, content_id, tag_name))
    }

    /// Every peer with at least one vote in this ledger, ascending.
    pub fn voters(&self) -> Vec<PeerId> {
        self.by_voter.keys().copied().collect()
    }

    /// Up to `limit` votes sampled uniformly without replacement, optionally
    /// leaving out the votes cast by `exclude`.
    pub fn sample_random_votes<R: Rng + ?Sized>(
        &self,
        limit: usize,
        exclude: Option<PeerId>,
        rng: &mut R,
    ) -> Vec<Vote> {
        let candidates: Vec<&VoteId> = self
            .order
            .iter()
            .filter(|id| match (exclude, self.votes.get(*id)) {
                (Some(excluded), Some(vote)) => vote.voter != excluded,
                _ => true,
            })
            .collect();

        candidates
            .choose_multiple(rng, limit)
            .filter_map(|id| self.votes.get(*id).cloned())
            .collect()
    }

    /// Up to `k` DAG tips for a new vote to link to.
    ///
    /// Falls back to the genesis node alone when no tip exists.
    pub fn select_tips<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> BTreeSet<VoteId> {
        if self.tips.is_empty() {
            return [VoteId::GENESIS].into_iter().collect();
        }
        let tips: Vec<VoteId> = self.tips.iter().copied().collect();
        tips.choose_multiple(rng, k).copied().collect()
    }

    /// Current DAG tips.
    pub fn tips(&self) -> &BTreeSet<VoteId> {
        &self.tips
    }

    /// All DAG edges as `(child, parent)` pairs, for provenance readers.
    pub fn dag_edges(&self) -> Vec<(VoteId, VoteId)> {
        let mut edges: Vec<(VoteId, VoteId)> = self
            .dag
            .iter()
            .flat_map(|(child, node)| node.parents.iter().map(move |parent| (*child, *parent)))
            .collect();
        edges.sort();
        edges
    }

    /// Number of DAG nodes, including genesis and not-yet-seen parents.
    pub fn dag_node_count(&self) -> usize {
        self.dag.len()
    }

    /// All votes in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Vote> {
        self.order.iter().filter_map(|id| self.votes.get(id))
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

impl Default for VoteLedger {
    fn default() -> Self {
        Self::new()
    }
}
