//! Tests for the shared model types.
//!
//! Verifies:
//! - Vote identity ignores the verdict and the provenance snapshots
//! - Rule applicability does not depend on corpus order or duplicates
//! - Error rate splits applications into correct and incorrect sets
//! - Wire names of enums

use std::collections::BTreeSet;

use tagtrust_protocol::*;

fn vote(verdict: bool, authors: &[u64]) -> Vote {
    Vote {
        voter: PeerId(4),
        content_id: ContentId(10),
        tag_name: "thriller".into(),
        verdict,
        authors: authors.iter().map(|a| PeerId(*a)).collect(),
        rule_ids: BTreeSet::new(),
        linked_votes: [VoteId::GENESIS].into_iter().collect(),
    }
}

// ═══════════════════════════════════════════════════════════════
// Vote identity
// ═══════════════════════════════════════════════════════════════

#[test]
fn vote_identity_ignores_verdict_and_snapshots() {
    assert_eq!(vote(true, &[1]).id(), vote(false, &[1, 2, 3]).id());
    assert_eq!(
        vote(true, &[]).id(),
        VoteId::compute(PeerId(4), ContentId(10), "thriller")
    );
}

#[test]
fn vote_identity_is_not_genesis() {
    let id = vote(true, &[]).id();
    assert!(!id.is_genesis());
    assert!(VoteId::GENESIS.is_genesis());
    assert_eq!(id.to_hex().len(), 64);
    assert_eq!(id.to_string().len(), 12);
}

#[test]
fn tag_key_of_vote() {
    let v = vote(true, &[]);
    assert_eq!(v.tag_key(), TagKey::new(ContentId(10), "thriller"));
    assert_eq!(v.tag_key().to_string(), "content-10/thriller");
}

#[test]
fn tag_from_vote_copies_provenance() {
    let mut v = vote(true, &[2, 5]);
    v.rule_ids.insert(RuleId(8));
    let tag = Tag::from_vote(&v);
    assert_eq!(tag.key, v.tag_key());
    assert_eq!(tag.authors, v.authors);
    assert_eq!(tag.rules, v.rule_ids);
    assert_eq!(tag.reputation_score, 0.0);
    assert_eq!(tag.weight, 0.0);
}

// ═══════════════════════════════════════════════════════════════
// Rule applicability
// ═══════════════════════════════════════════════════════════════

#[test]
fn applicability_ignores_corpus_order_and_duplicates() {
    let forward: Vec<ContentId> = (0..50).map(ContentId).collect();
    let mut shuffled: Vec<ContentId> = forward.iter().rev().copied().collect();
    shuffled.extend_from_slice(&forward[..5]);

    let mut a = Rule::new(RuleId(2), PeerId(1), "x", 0.3, 0.5, RuleKind::Accurate).unwrap();
    let mut b = a.clone();
    a.determine_applicable_content(&forward);
    b.determine_applicable_content(&shuffled);

    assert_eq!(a.applicable_correct, b.applicable_correct);
    assert_eq!(a.applicable_incorrect, b.applicable_incorrect);
}

#[test]
fn error_rate_splits_applications() {
    let corpus: Vec<ContentId> = (0..40).map(ContentId).collect();
    let mut rule = Rule::new(RuleId(3), PeerId(1), "x", 0.5, 0.25, RuleKind::Accurate).unwrap();
    rule.determine_applicable_content(&corpus);

    assert_eq!(rule.applicable_correct.len() + rule.applicable_incorrect.len(), 20);
    assert_eq!(rule.applicable_incorrect.len(), 5);
    assert!(rule
        .applicable_correct
        .is_disjoint(&rule.applicable_incorrect));
    for id in &rule.applicable_incorrect {
        assert_eq!(rule.accuracy_on(*id), Some(false));
    }
}

#[test]
fn zero_coverage_applies_nowhere() {
    let corpus: Vec<ContentId> = (0..10).map(ContentId).collect();
    let mut rule = Rule::new(RuleId(1), PeerId(1), "x", 0.0, 0.0, RuleKind::Accurate).unwrap();
    rule.determine_applicable_content(&corpus);
    assert!(corpus.iter().all(|id| !rule.applies_to(*id)));
}

#[test]
fn rule_rejects_error_rate_above_one() {
    let err = Rule::new(RuleId(5), PeerId(1), "x", 0.5, 1.5, RuleKind::Spam).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidRule { rule: RuleId(5), .. }));
}

// ═══════════════════════════════════════════════════════════════
// Wire names
// ═══════════════════════════════════════════════════════════════

#[test]
fn enum_wire_names_are_snake_case() {
    assert_eq!(
        serde_json::to_string(&PeerRole::NaiveDownvoter).unwrap(),
        "\"naive_downvoter\""
    );
    assert_eq!(serde_json::to_string(&RuleKind::Spam).unwrap(), "\"spam\"");
    let role: PeerRole = serde_json::from_str("\"random_voter\"").unwrap();
    assert!(role.is_adversarial());
}
