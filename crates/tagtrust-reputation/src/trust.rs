//! Per-peer trust state: the similarity matrix and the flow map.
//!
//! Both are recomputed from scratch out of the local ledger; nothing here is
//! shared with or copied from other peers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tagtrust_protocol::PeerId;
use tagtrust_state::{TagStore, VoteLedger};

use crate::flow::FlowGraph;
use crate::similarity::compute_similarity;

/// Similarity and transitive trust as seen by one peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEngine {
    me: PeerId,
    similarities: BTreeMap<(PeerId, PeerId), f64>,
    flows: BTreeMap<PeerId, f64>,
}

impl TrustEngine {
    pub fn new(me: PeerId) -> Self {
        Self {
            me,
            similarities: BTreeMap::new(),
            flows: BTreeMap::new(),
        }
    }

    pub fn me(&self) -> PeerId {
        self.me
    }

    /// Recompute similarity for every ordered pair of known peers.
    ///
    /// Known peers are the voters present in the ledger plus this peer. The
    /// degenerate `(p, p)` pair is only kept for `p == me`.
    pub fn compute_correlations(&mut self, ledger: &VoteLedger, tags: &TagStore) {
        let mut peers: BTreeSet<PeerId> = ledger.voters().into_iter().collect();
        peers.insert(self.me);

        self.similarities.clear();
        for &a in &peers {
            for &b in &peers {
                if a == b && a != self.me {
                    continue;
                }
                let similarity = compute_similarity(ledger, tags, a, b);
                self.similarities.insert((a, b), similarity);
            }
        }

        tracing::debug!(
            peer = %self.me,
            known_peers = peers.len(),
            pairs = self.similarities.len(),
            "Computed similarity matrix"
        );
    }

    /// Recompute the flow map from the current similarity matrix.
    ///
    /// `flow[me]` is the sum of every other peer's flow, which gives this
    /// peer's own opinion the same total weight as everybody else's. A peer
    /// that reaches nobody gets `flow[me] = 1` so it still trusts itself.
    pub fn compute_flows(&mut self) {
        let mut graph = FlowGraph::new();
        for (&(a, b), &similarity) in &self.similarities {
            graph.set_edge(a, b, similarity);
        }

        self.flows.clear();
        for other in graph.reachable_from(self.me) {
            let flow = graph.max_flow(self.me, other);
            self.flows.insert(other, flow);
        }

        let own = if self.flows.is_empty() {
            1.0
        } else {
            self.flows.values().sum()
        };
        self.flows.insert(self.me, own);

        tracing::debug!(
            peer = %self.me,
            reachable = self.flows.len() - 1,
            own_flow = own,
            "Computed transitive trust"
        );
    }

    /// Similarity of `a` and `b`; 0 when the pair is unknown.
    pub fn get_similarity(&self, a: PeerId, b: PeerId) -> f64 {
        self.similarities.get(&(a, b)).copied().unwrap_or(0.0)
    }

    /// Transitive trust in `peer`; 0 when unknown.
    pub fn get_flow(&self, peer: PeerId) -> f64 {
        self.flows.get(&peer).copied().unwrap_or(0.0)
    }

    pub fn similarity_matrix(&self) -> &BTreeMap<(PeerId, PeerId), f64> {
        &self.similarities
    }

    pub fn flow_map(&self) -> &BTreeMap<PeerId, f64> {
        &self.flows
    }

    /// Every peer this engine holds a trust value or similarity for.
    pub fn known_peers(&self) -> BTreeSet<PeerId> {
        self.similarities
            .keys()
            .flat_map(|(a, b)| [*a, *b])
            .chain(self.flows.keys().copied())
            .collect()
    }
}
