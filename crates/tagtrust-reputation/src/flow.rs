//! Undirected capacity graph and max-flow (Edmonds-Karp).
//!
//! Nodes are peers, edge capacities are similarity scores. Max-flow assumes
//! non-negative capacities, so negative similarity (systematic disagreement)
//! is clamped to zero: distrust never carries trust, it just blocks the path.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tagtrust_protocol::PeerId;

/// Residual capacities below this are treated as exhausted.
const FLOW_EPSILON: f64 = 1e-12;

/// Undirected graph with non-negative edge capacities.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    adjacency: BTreeMap<PeerId, BTreeMap<PeerId, f64>>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self {
            adjacency: BTreeMap::new(),
        }
    }

    /// Set the capacity of the undirected edge `{a, b}`, replacing any
    /// previous value. Negative capacities are clamped to 0; self-loops are
    /// ignored.
    pub fn set_edge(&mut self, a: PeerId, b: PeerId, capacity: f64) {
        if a == b {
            return;
        }
        let capacity = if capacity.is_finite() { capacity.max(0.0) } else { 0.0 };
        self.adjacency.entry(a).or_default().insert(b, capacity);
        self.adjacency.entry(b).or_default().insert(a, capacity);
    }

    pub fn capacity(&self, a: PeerId, b: PeerId) -> f64 {
        self.adjacency
            .get(&a)
            .and_then(|edges| edges.get(&b))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.adjacency.contains_key(&peer)
    }

    pub fn nodes(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Peers reachable from `source` over edges of any capacity, excluding `source`.
    pub fn reachable_from(&self, source: PeerId) -> BTreeSet<PeerId> {
        let mut seen = BTreeSet::new();
        if !self.contains(source) {
            return seen;
        }
        let mut queue = VecDeque::from([source]);
        seen.insert(source);
        while let Some(node) = queue.pop_front() {
            for next in self.adjacency[&node].keys() {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        seen.remove(&source);
        seen
    }

    /// Maximum flow from `source` to `sink`.
    ///
    /// Returns 0 when either endpoint is missing or they are the same node.
    pub fn max_flow(&self, source: PeerId, sink: PeerId) -> f64 {
        if source == sink || !self.contains(source) || !self.contains(sink) {
            return 0.0;
        }

        // Each undirected edge is a pair of opposing arcs with the same
        // capacity; residual[u][v] starts at that capacity.
        let mut residual: BTreeMap<PeerId, BTreeMap<PeerId, f64>> = self.adjacency.clone();
        let mut total = 0.0;

        loop {
            // Breadth-first search for the shortest augmenting path.
            let mut predecessor: BTreeMap<PeerId, PeerId> = BTreeMap::new();
            let mut queue = VecDeque::from([source]);
            let mut found = false;

            'search: while let Some(node) = queue.pop_front() {
                for (next, cap) in &residual[&node] {
                    if *cap <= FLOW_EPSILON || *next == source || predecessor.contains_key(next) {
                        continue;
                    }
                    predecessor.insert(*next, node);
                    if *next == sink {
                        found = true;
                        break 'search;
                    }
                    queue.push_back(*next);
                }
            }

            if !found {
                break;
            }

            // Bottleneck along the path.
            let mut bottleneck = f64::INFINITY;
            let mut node = sink;
            while node != source {
                let prev = predecessor[&node];
                bottleneck = bottleneck.min(residual[&prev][&node]);
                node = prev;
            }

            // Push the bottleneck through the path.
            let mut node = sink;
            while node != source {
                let prev = predecessor[&node];
                if let Some(cap) = residual.get_mut(&prev).and_then(|e| e.get_mut(&node)) {
                    *cap -= bottleneck;
                }
                *residual.entry(node).or_default().entry(prev).or_insert(0.0) += bottleneck;
                node = prev;
            }

            total += bottleneck;
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u64) -> PeerId {
        PeerId(id)
    }

    #[test]
    fn test_single_edge() {
        let mut g = FlowGraph::new();
        g.set_edge(p(1), p(2), 0.8);
        assert!((g.max_flow(p(1), p(2)) - 0.8).abs() < 1e-12);
        assert!((g.max_flow(p(2), p(1)) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_paths_add_up() {
        // 1 -> 2 directly (0.5) and 1 -> 3 -> 2 (bottleneck 0.3).
        let mut g = FlowGraph::new();
        g.set_edge(p(1), p(2), 0.5);
        g.set_edge(p(1), p(3), 0.9);
        g.set_edge(p(3), p(2), 0.3);
        assert!((g.max_flow(p(1), p(2)) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_negative_capacity_clamped() {
        let mut g = FlowGraph::new();
        g.set_edge(p(1), p(2), -0.7);
        assert_eq!(g.capacity(p(1), p(2)), 0.0);
        assert_eq!(g.max_flow(p(1), p(2)), 0.0);
        assert!(g.reachable_from(p(1)).contains(&p(2)));
    }

    #[test]
    fn test_unknown_endpoints() {
        let mut g = FlowGraph::new();
        g.set_edge(p(1), p(2), 1.0);
        assert_eq!(g.max_flow(p(1), p(9)), 0.0);
        assert_eq!(g.max_flow(p(1), p(1)), 0.0);
        assert!(g.reachable_from(p(9)).is_empty());
    }

    #[test]
    fn test_self_loop_ignored() {
        let mut g = FlowGraph::new();
        g.set_edge(p(1), p(1), 1.0);
        assert!(!g.contains(p(1)));
    }
}
