use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::RULE_SEED_DOMAIN;
use crate::error::ProtocolError;
use crate::identity::{ContentId, PeerId, RuleId, TagKey, VoteId};

/// A content item as seen by one peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    /// Probability mass used when sampling "a random popular item".
    pub popularity: f64,
    /// Names of the tags on this item, in creation order.
    pub tags: Vec<String>,
}

impl Content {
    pub fn new(id: ContentId, popularity: f64) -> Self {
        Self {
            id,
            popularity,
            tags: Vec::new(),
        }
    }

    /// Placeholder for content first learned about through a gossiped vote.
    pub fn stub(id: ContentId) -> Self {
        Self::new(id, 0.0)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }

    /// Append a tag name, keeping creation order. Returns false if it was already present.
    pub fn push_tag(&mut self, name: &str) -> bool {
        if self.has_tag(name) {
            return false;
        }
        self.tags.push(name.to_string());
        true
    }
}

/// A (content, name) annotation with accumulating provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub key: TagKey,
    /// Peers that explicitly proposed this tag.
    pub authors: BTreeSet<PeerId>,
    /// Rules that generated this tag.
    pub rules: BTreeSet<RuleId>,
    /// Subjective, trust-weighted score of the votes on this tag.
    pub reputation_score: f64,
    /// Final score blending the reputation with contributor reputations.
    pub weight: f64,
}

impl Tag {
    pub fn new(key: TagKey) -> Self {
        Self {
            key,
            authors: BTreeSet::new(),
            rules: BTreeSet::new(),
            reputation_score: 0.0,
            weight: 0.0,
        }
    }

    /// Minimal tag built from the provenance a gossiped vote carries.
    pub fn from_vote(vote: &Vote) -> Self {
        let mut tag = Self::new(vote.tag_key());
        tag.authors = vote.authors.clone();
        tag.rules = vote.rule_ids.clone();
        tag
    }
}

/// Behavioural profile of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Accurate,
    Spam,
}

/// A deterministic content-tagging rule with a coverage/error profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub author: PeerId,
    pub output_tag: String,
    /// Fraction of the corpus this rule applies to.
    pub coverage: f64,
    /// Fraction of applications that produce an inaccurate tag.
    pub error_rate: f64,
    pub kind: RuleKind,
    pub applicable_correct: BTreeSet<ContentId>,
    pub applicable_incorrect: BTreeSet<ContentId>,
    pub reputation_score: f64,
}

impl Rule {
    pub fn new(
        id: RuleId,
        author: PeerId,
        output_tag: impl Into<String>,
        coverage: f64,
        error_rate: f64,
        kind: RuleKind,
    ) -> Result<Self, ProtocolError> {
        if !(0.0..=1.0).contains(&coverage) {
            return Err(ProtocolError::InvalidRule {
                rule: id,
                reason: format!("coverage {} outside [0, 1]", coverage),
            });
        }
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(ProtocolError::InvalidRule {
                rule: id,
                reason: format!("error rate {} outside [0, 1]", error_rate),
            });
        }
        Ok(Self {
            id,
            author,
            output_tag: output_tag.into(),
            coverage,
            error_rate,
            kind,
            applicable_correct: BTreeSet::new(),
            applicable_incorrect: BTreeSet::new(),
            reputation_score: 0.0,
        })
    }

    /// Seed derived from the rule identity and the corpus size only, so every
    /// copy of the rule picks the same items.
    fn applicability_seed(&self, corpus_size: usize) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(RULE_SEED_DOMAIN);
        hasher.update(self.id.0.to_be_bytes());
        hasher.update(self.author.0.to_be_bytes());
        hasher.update((self.output_tag.len() as u64).to_be_bytes());
        hasher.update(self.output_tag.as_bytes());
        hasher.update((corpus_size as u64).to_be_bytes());
        let digest = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(seed)
    }

    /// Precompute which content items this rule tags, and which of those
    /// applications are inaccurate.
    ///
    /// `round(coverage * n)` items are drawn from the sorted corpus; the first
    /// `round(error_rate * count)` draws are the incorrect applications.
    pub fn determine_applicable_content(&mut self, corpus: &[ContentId]) {
        let mut sorted = corpus.to_vec();
        sorted.sort();
        sorted.dedup();

        let n = sorted.len();
        let count = ((self.coverage * n as f64).round() as usize).min(n);
        let incorrect = ((self.error_rate * count as f64).round() as usize).min(count);

        let mut rng = StdRng::seed_from_u64(self.applicability_seed(n));
        let picks = rand::seq::index::sample(&mut rng, n, count).into_vec();

        self.applicable_correct.clear();
        self.applicable_incorrect.clear();
        for (draw, idx) in picks.into_iter().enumerate() {
            if draw < incorrect {
                self.applicable_incorrect.insert(sorted[idx]);
            } else {
                self.applicable_correct.insert(sorted[idx]);
            }
        }
    }

    pub fn applies_to(&self, content_id: ContentId) -> bool {
        self.applicable_correct.contains(&content_id)
            || self.applicable_incorrect.contains(&content_id)
    }

    /// The verdict an honest, well-informed peer would give the tag this rule
    /// produces on `content_id`. `None` when the rule does not fire there.
    pub fn accuracy_on(&self, content_id: ContentId) -> Option<bool> {
        if self.applicable_correct.contains(&content_id) {
            Some(true)
        } else if self.applicable_incorrect.contains(&content_id) {
            Some(false)
        } else {
            None
        }
    }
}

/// An immutable, signed opinion of one peer on one tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: PeerId,
    pub content_id: ContentId,
    pub tag_name: String,
    /// `true` = accurate (+1), `false` = inaccurate (-1).
    pub verdict: bool,
    /// Tag authors as known to the voter when the vote was cast.
    pub authors: BTreeSet<PeerId>,
    /// Rules that had generated the tag when the vote was cast.
    pub rule_ids: BTreeSet<RuleId>,
    /// Parent pointers into the vote DAG.
    pub linked_votes: BTreeSet<VoteId>,
}

impl Vote {
    pub fn id(&self) -> VoteId {
        VoteId::compute(self.voter, self.content_id, &self.tag_name)
    }

    pub fn tag_key(&self) -> TagKey {
        TagKey::new(self.content_id, self.tag_name.clone())
    }

    /// +1.0 for an accurate verdict, -1.0 otherwise.
    pub fn signed_value(&self) -> f64 {
        if self.verdict {
            1.0
        } else {
            -1.0
        }
    }
}

/// Scripted behaviour of a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    #[default]
    Honest,
    /// Upvotes every tag it learns about.
    NaiveUpvoter,
    /// Downvotes every tag it learns about.
    NaiveDownvoter,
    /// Votes uniformly at random on every tag it learns about.
    RandomVoter,
}

impl PeerRole {
    pub fn is_adversarial(&self) -> bool {
        !matches!(self, PeerRole::Honest)
    }

    /// Verdict this role casts in response to an unseen tag, if any.
    pub fn counter_vote<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<bool> {
        match self {
            PeerRole::Honest => None,
            PeerRole::NaiveUpvoter => Some(true),
            PeerRole::NaiveDownvoter => Some(false),
            PeerRole::RandomVoter => Some(rng.gen_bool(0.5)),
        }
    }
}
