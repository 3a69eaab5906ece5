//! Trust-weighted reputation for tags, rules and users.
//!
//! `ReputationAggregator::recompute` runs the whole pipeline for one peer.
//! Each stage reads the output of the previous one:
//!
//!   similarity -> flows -> tag reputation -> rule reputation
//!     -> user reputation -> tag weight
//!
//! Degenerate inputs (no voter above the trust threshold, zero total
//! weight, empty contributor pool) resolve to neutral values, never errors.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tagtrust_protocol::{PeerId, RuleId, TagKey, DEFAULT_TRUST_THRESHOLD};
use tagtrust_state::{RuleStore, TagStore, VoteLedger};

use crate::trust::TrustEngine;

/// Which per-voter trust value gates participation in tag reputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMetric {
    /// Transitive trust `flow[voter]`.
    #[default]
    Flow,
    /// Direct similarity `similarity(self, voter)`.
    Similarity,
}

/// Configuration for the reputation aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Voters whose gating metric has a magnitude below this are ignored
    /// when scoring a tag.
    pub trust_threshold: f64,
    pub threshold_metric: ThresholdMetric,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            trust_threshold: DEFAULT_TRUST_THRESHOLD,
            threshold_metric: ThresholdMetric::Flow,
        }
    }
}

/// Recomputes every reputation score held by one peer.
#[derive(Debug, Clone, Default)]
pub struct ReputationAggregator {
    config: AggregatorConfig,
    user_reputations: BTreeMap<PeerId, f64>,
}

impl ReputationAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            user_reputations: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Run the full pipeline, writing scores into `tags` and `rules`.
    pub fn recompute(
        &mut self,
        ledger: &VoteLedger,
        tags: &mut TagStore,
        rules: &mut RuleStore,
        trust: &mut TrustEngine,
    ) {
        trust.compute_correlations(ledger, tags);
        trust.compute_flows();

        for tag in tags.iter_mut() {
            tag.reputation_score = self.tag_reputation(&tag.key, ledger, trust);
        }

        for rule in rules.iter_mut() {
            rule.reputation_score = self.rule_reputation(rule.id, ledger, tags, trust);
        }

        self.compute_user_reputations(tags, trust);

        let mut weighted = 0usize;
        for tag in tags.iter_mut() {
            if let Some(weight) =
                tag_weight(tag.reputation_score, &tag.rules, &tag.authors, rules, &self.user_reputations)
            {
                tag.weight = weight;
                weighted += 1;
            }
        }

        tracing::debug!(
            peer = %trust.me(),
            tags = tags.len(),
            rules = rules.len(),
            users = self.user_reputations.len(),
            weighted_tags = weighted,
            "Recomputed reputations"
        );
    }

    fn gating_value(&self, trust: &TrustEngine, voter: PeerId) -> f64 {
        match self.config.threshold_metric {
            ThresholdMetric::Flow => trust.get_flow(voter),
            ThresholdMetric::Similarity => trust.get_similarity(trust.me(), voter),
        }
    }

    /// Flow-weighted average of the signed votes on `key`, counting only
    /// voters that clear the trust threshold. 0 when nobody does.
    pub fn tag_reputation(&self, key: &TagKey, ledger: &VoteLedger, trust: &TrustEngine) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for vote in ledger.votes_for_tag(key) {
            if self.gating_value(trust, vote.voter).abs() < self.config.trust_threshold {
                continue;
            }
            let flow = trust.get_flow(vote.voter);
            weighted_sum += flow * vote.signed_value();
            weight_total += flow;
        }

        if weight_total == 0.0 {
            0.0
        } else {
            weighted_sum / weight_total
        }
    }

    /// Reputation of a rule from the votes on every tag it generated.
    ///
    /// Each voter's mean signed vote is scaled by how similar that voter is
    /// to this peer, then the per-voter scores are averaged with flow as the
    /// weight.
    pub fn rule_reputation(
        &self,
        rule: RuleId,
        ledger: &VoteLedger,
        tags: &TagStore,
        trust: &TrustEngine,
    ) -> f64 {
        let mut per_voter: BTreeMap<PeerId, (f64, usize)> = BTreeMap::new();
        for tag in tags.tags_generated_by(rule) {
            for vote in ledger.votes_for_tag(&tag.key) {
                let entry = per_voter.entry(vote.voter).or_insert((0.0, 0));
                entry.0 += vote.signed_value();
                entry.1 += 1;
            }
        }

        let me = trust.me();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for (voter, (sum, count)) in per_voter {
            let score = trust.get_similarity(me, voter) * (sum / count as f64);
            let flow = trust.get_flow(voter);
            weighted_sum += flow * score;
            weight_total += flow;
        }

        if weight_total == 0.0 {
            0.0
        } else {
            weighted_sum / weight_total
        }
    }

    /// Score every known peer. This peer always scores 1; tag authors blend
    /// the mean reputation of their tags with their flow; everyone else
    /// scores their flow.
    pub fn compute_user_reputations(&mut self, tags: &TagStore, trust: &TrustEngine) {
        let me = trust.me();
        let mut peers: BTreeSet<PeerId> = trust.known_peers();
        for tag in tags.iter() {
            peers.extend(tag.authors.iter().copied());
        }

        self.user_reputations.clear();
        for peer in peers {
            let reputation = if peer == me {
                1.0
            } else {
                let authored = tags.tags_authored_by(peer);
                let flow = trust.get_flow(peer);
                if authored.is_empty() {
                    flow
                } else {
                    let mean = authored.iter().map(|t| t.reputation_score).sum::<f64>()
                        / authored.len() as f64;
                    (mean + flow) / 2.0
                }
            };
            self.user_reputations.insert(peer, reputation);
        }
        self.user_reputations.insert(me, 1.0);
    }

    /// Reputation of `peer` from the last recompute; 0 when unknown.
    pub fn user_reputation(&self, peer: PeerId) -> f64 {
        self.user_reputations.get(&peer).copied().unwrap_or(0.0)
    }

    pub fn user_reputations(&self) -> &BTreeMap<PeerId, f64> {
        &self.user_reputations
    }
}

/// Blend a tag's reputation with the mean reputation of its generating
/// rules and its authors. `None` when the tag has no contributor at all.
///
/// Rules missing from `rules` are left out of the pool; authors missing from
/// `users` count as 0.
pub fn tag_weight(
    reputation: f64,
    rule_ids: &BTreeSet<RuleId>,
    authors: &BTreeSet<PeerId>,
    rules: &RuleStore,
    users: &BTreeMap<PeerId, f64>,
) -> Option<f64> {
    let pool: Vec<f64> = rule_ids
        .iter()
        .filter_map(|id| rules.get(*id).map(|rule| rule.reputation_score))
        .chain(
            authors
                .iter()
                .map(|author| users.get(author).copied().unwrap_or(0.0)),
        )
        .collect();

    if pool.is_empty() {
        return None;
    }
    let mean = pool.iter().sum::<f64>() / pool.len() as f64;
    Some((reputation + mean) / 2.0)
}
