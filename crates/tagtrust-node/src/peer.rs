//! A single peer and its local view of the world.
//!
//! Every peer owns its stores, ledger and trust state outright. The only
//! thing that crosses peer boundaries is a cloned `Vote`.

use std::collections::BTreeMap;

use rand::{Rng, RngCore};
use tagtrust_gossip::{ExchangePolicy, RandomExchangePolicy};
use tagtrust_protocol::{
    Content, ContentId, PeerId, PeerRole, Rule, Tag, TagKey, Vote, VoteId,
    DEFAULT_TIPS_PER_VOTE,
};
use tagtrust_reputation::{AggregatorConfig, ReputationAggregator, TrustEngine};
use tagtrust_state::{ContentStore, RuleStore, TagStore, VoteLedger};

use crate::NodeError;

/// Knobs shared by every peer of a network.
#[derive(Debug, Clone)]
pub struct PeerSettings {
    pub aggregator: AggregatorConfig,
    pub exchange: RandomExchangePolicy,
    pub tips_per_vote: usize,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            exchange: RandomExchangePolicy::default(),
            tips_per_vote: DEFAULT_TIPS_PER_VOTE,
        }
    }
}

/// One participant: local stores, vote ledger, trust and reputation state.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    role: PeerRole,
    content: ContentStore,
    tags: TagStore,
    rules: RuleStore,
    ledger: VoteLedger,
    trust: TrustEngine,
    aggregator: ReputationAggregator,
    neighbours: Vec<PeerId>,
    exchange_policy: Box<dyn ExchangePolicy>,
    tips_per_vote: usize,
}

impl Peer {
    pub fn new(id: PeerId, role: PeerRole, settings: &PeerSettings) -> Self {
        Self {
            id,
            role,
            content: ContentStore::new(),
            tags: TagStore::new(),
            rules: RuleStore::new(),
            ledger: VoteLedger::new(),
            trust: TrustEngine::new(id),
            aggregator: ReputationAggregator::new(settings.aggregator.clone()),
            neighbours: Vec::new(),
            exchange_policy: Box::new(settings.exchange),
            tips_per_vote: settings.tips_per_vote,
        }
    }

    /// Replace the policy deciding which votes this peer hands out.
    pub fn with_exchange_policy(mut self, policy: Box<dyn ExchangePolicy>) -> Self {
        self.exchange_policy = policy;
        self
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn add_content(&mut self, content: Content) -> bool {
        self.content.add_content(content)
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.add_rule(rule);
    }

    /// Add `other` as a neighbour. Returns false for self or a duplicate.
    pub fn connect(&mut self, other: PeerId) -> bool {
        if other == self.id || self.neighbours.contains(&other) {
            return false;
        }
        self.neighbours.push(other);
        true
    }

    pub fn neighbours(&self) -> &[PeerId] {
        &self.neighbours
    }

    /// Materialise the tags every known rule produces on local content.
    ///
    /// Returns how many tags were newly created.
    pub fn apply_rules_to_content(&mut self) -> usize {
        let mut created = 0;
        for rule in self.rules.iter() {
            let targets = rule
                .applicable_correct
                .iter()
                .chain(rule.applicable_incorrect.iter());
            for content_id in targets {
                let Some(content) = self.content.get_mut(*content_id) else {
                    continue;
                };
                content.push_tag(&rule.output_tag);
                let (tag, is_new) = self
                    .tags
                    .get_or_create(TagKey::new(*content_id, rule.output_tag.clone()));
                tag.rules.insert(rule.id);
                if is_new {
                    created += 1;
                }
            }
        }

        tracing::debug!(
            peer = %self.id,
            rules = self.rules.len(),
            created,
            "Applied rules to content"
        );
        created
    }

    /// Author a tag on local content. Returns true if the tag was new.
    pub fn create_tag(&mut self, content_id: ContentId, name: &str) -> Result<bool, NodeError> {
        let content = self
            .content
            .get_mut(content_id)
            .ok_or(NodeError::UnknownContent {
                peer: self.id,
                content: content_id,
            })?;
        content.push_tag(name);

        let key = TagKey::new(content_id, name);
        let (tag, is_new) = self.tags.get_or_create(key);
        tag.authors.insert(self.id);

        tracing::debug!(peer = %self.id, tag = %tag.key, is_new, "Created tag");
        Ok(is_new)
    }

    /// Cast a vote on a local tag.
    ///
    /// Returns `Ok(None)` if this peer already voted on the tag. Voting on
    /// content or a tag this peer does not hold is an error.
    pub fn vote<R: Rng + ?Sized>(
        &mut self,
        key: &TagKey,
        verdict: bool,
        rng: &mut R,
    ) -> Result<Option<VoteId>, NodeError> {
        if !self.content.contains(key.content_id) {
            return Err(NodeError::UnknownContent {
                peer: self.id,
                content: key.content_id,
            });
        }
        let tag = self.tags.get(key).ok_or_else(|| NodeError::UnknownTag {
            peer: self.id,
            tag: key.clone(),
        })?;
        if self
            .ledger
            .has_user_voted_on_tag(self.id, key.content_id, &key.name)
        {
            return Ok(None);
        }

        let vote = Vote {
            voter: self.id,
            content_id: key.content_id,
            tag_name: key.name.clone(),
            verdict,
            authors: tag.authors.clone(),
            rule_ids: tag.rules.clone(),
            linked_votes: self.ledger.select_tips(self.tips_per_vote, rng),
        };
        let id = vote.id();
        self.ledger.add_vote(vote);
        Ok(Some(id))
    }

    /// Integrate a vote received through gossip.
    ///
    /// Unknown content becomes a stub, an unknown tag is created from the
    /// provenance the vote carries, and the vote's authors are merged into
    /// the local tag. Adversarial roles answer a tag they have not voted on
    /// yet with their own vote. Returns false if the vote was already known.
    pub fn process_incoming_vote<R: Rng + ?Sized>(
        &mut self,
        vote: Vote,
        rng: &mut R,
    ) -> Result<bool, NodeError> {
        if self.ledger.has_vote(&vote) {
            return Ok(false);
        }

        self.content.ensure(vote.content_id).push_tag(&vote.tag_name);

        let key = vote.tag_key();
        if self.tags.contains(&key) {
            self.tags.merge_authors(&key, &vote.authors);
        } else {
            self.tags.insert(Tag::from_vote(&vote));
        }
        self.ledger.add_vote(vote);

        if self
            .ledger
            .has_user_voted_on_tag(self.id, key.content_id, &key.name)
        {
            return Ok(true);
        }
        if let Some(verdict) = self.role.counter_vote(rng) {
            if let Some(id) = self.vote(&key, verdict, rng)? {
                tracing::debug!(
                    peer = %self.id,
                    role = ?self.role,
                    tag = %key,
                    verdict,
                    vote = %id,
                    "Adversarial response vote"
                );
            }
        }
        Ok(true)
    }

    /// Process a batch of gossiped votes one by one. Returns how many were new.
    pub fn process_incoming_votes<R: Rng + ?Sized>(
        &mut self,
        votes: Vec<Vote>,
        rng: &mut R,
    ) -> Result<usize, NodeError> {
        let mut added = 0;
        for vote in votes {
            if self.process_incoming_vote(vote, rng)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Votes to hand to `requester` when it pulls from this peer.
    pub fn sample_random_votes(&self, requester: PeerId, rng: &mut dyn RngCore) -> Vec<Vote> {
        self.exchange_policy.select_votes(&self.ledger, requester, rng)
    }

    /// Recompute similarity, flow and every reputation score.
    pub fn recompute_reputations(&mut self) {
        self.aggregator.recompute(
            &self.ledger,
            &mut self.tags,
            &mut self.rules,
            &mut self.trust,
        );
    }

    /// Every tag in this peer's view, in creation order.
    pub fn all_tags(&self) -> Vec<&Tag> {
        self.tags.iter().collect()
    }

    pub fn user_reputations(&self) -> &BTreeMap<PeerId, f64> {
        self.aggregator.user_reputations()
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn trust(&self) -> &TrustEngine {
        &self.trust
    }
}
