//! Agreement-based similarity between two peers.
//!
//! Votes are grouped per evidence key: a rule id (every vote on a tag the
//! rule generated counts for the rule) or a tag. Authoring a tag counts as an
//! implicit upvote of it. For every key both peers have an opinion on, the
//! absolute difference of their mean signed votes is taken; similarity is
//! one minus the mean of those differences:
//!
//!   sim(a, b) = 1 - mean_k |mean(votes_a[k]) - mean(votes_b[k])|
//!
//! Each difference lies in [0, 2], so the result lies in [-1, 1]. Without a
//! shared key the similarity is 0.

use std::collections::BTreeMap;

use tagtrust_protocol::{PeerId, RuleId, TagKey};
use tagtrust_state::{TagStore, VoteLedger};

/// Something two peers can both have an opinion on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvidenceKey {
    Rule(RuleId),
    Tag(TagKey),
}

/// Signed votes of side A and side B for one evidence key.
type Evidence = BTreeMap<EvidenceKey, (Vec<f64>, Vec<f64>)>;

fn collect_side(
    evidence: &mut Evidence,
    ledger: &VoteLedger,
    tags: &TagStore,
    peer: PeerId,
    side_a: bool,
) {
    let mut push = |key: EvidenceKey, value: f64| {
        let entry = evidence.entry(key).or_default();
        if side_a {
            entry.0.push(value);
        } else {
            entry.1.push(value);
        }
    };

    for vote in ledger.votes_for_user(peer) {
        let value = vote.signed_value();
        for rule_id in &vote.rule_ids {
            push(EvidenceKey::Rule(*rule_id), value);
        }
        push(EvidenceKey::Tag(vote.tag_key()), value);
    }

    // Authorship is self-endorsement.
    for tag in tags.tags_authored_by(peer) {
        push(EvidenceKey::Tag(tag.key.clone()), 1.0);
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Similarity of `a` and `b` as observed in one peer's ledger and tag store.
pub fn compute_similarity(ledger: &VoteLedger, tags: &TagStore, a: PeerId, b: PeerId) -> f64 {
    let mut evidence = Evidence::new();
    collect_side(&mut evidence, ledger, tags, a, true);
    collect_side(&mut evidence, ledger, tags, b, false);

    let diffs: Vec<f64> = evidence
        .values()
        .filter(|(votes_a, votes_b)| !votes_a.is_empty() && !votes_b.is_empty())
        .map(|(votes_a, votes_b)| (mean(votes_a) - mean(votes_b)).abs())
        .collect();

    if diffs.is_empty() {
        return 0.0;
    }
    1.0 - mean(&diffs)
}
