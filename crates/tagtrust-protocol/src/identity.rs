use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::VOTE_ID_DOMAIN;

/// Identifier of a peer (user) in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Identifier of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentId(pub u64);

impl ContentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "content-{}", self.0)
    }
}

/// Identifier of a tagging rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub u64);

impl RuleId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule-{}", self.0)
    }
}

/// Canonical identity of a tag: the content it annotates plus its name.
///
/// Unique within one peer's local view. Two peers may hold different
/// `Tag` objects for the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagKey {
    pub content_id: ContentId,
    pub name: String,
}

impl TagKey {
    pub fn new(content_id: ContentId, name: impl Into<String>) -> Self {
        Self {
            content_id,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.content_id, self.name)
    }
}

/// Identity of a vote: SHA-256 over (voter, content, tag name).
///
/// The verdict is deliberately not part of the identity, so a peer keeps
/// at most one vote per (voter, content, tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoteId(pub [u8; 32]);

impl VoteId {
    /// Root of every vote DAG. Has no parents.
    pub const GENESIS: VoteId = VoteId([0u8; 32]);

    /// Compute the identity of the vote cast by `voter` on `(content_id, tag_name)`.
    pub fn compute(voter: PeerId, content_id: ContentId, tag_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(VOTE_ID_DOMAIN);
        hasher.update(voter.0.to_be_bytes());
        hasher.update(content_id.0.to_be_bytes());
        hasher.update((tag_name.len() as u64).to_be_bytes());
        hasher.update(tag_name.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for VoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to tell votes apart in logs.
        write!(f, "{}", &self.to_hex()[..12])
    }
}
