//! Externally scripted actions fed into the simulation clock.

use serde::{Deserialize, Serialize};
use tagtrust_gossip::SimTime;
use tagtrust_protocol::{ContentId, PeerId, TagKey};

/// What a scripted action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// The user authors the tag on the content item.
    Create,
    /// The user votes on an existing tag.
    Vote,
}

/// One timestamped user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAction {
    /// Seconds since the start of the simulation.
    pub timestamp: f64,
    pub command: Command,
    pub user_id: PeerId,
    pub content_id: ContentId,
    pub tag_name: String,
    /// Verdict of a `Vote`; ignored by `Create`.
    #[serde(default = "default_true")]
    pub is_upvote: bool,
}

fn default_true() -> bool {
    true
}

impl ScenarioAction {
    pub fn create(timestamp: f64, user_id: PeerId, content_id: ContentId, tag_name: &str) -> Self {
        Self {
            timestamp,
            command: Command::Create,
            user_id,
            content_id,
            tag_name: tag_name.to_string(),
            is_upvote: true,
        }
    }

    pub fn vote(
        timestamp: f64,
        user_id: PeerId,
        content_id: ContentId,
        tag_name: &str,
        is_upvote: bool,
    ) -> Self {
        Self {
            timestamp,
            command: Command::Vote,
            user_id,
            content_id,
            tag_name: tag_name.to_string(),
            is_upvote,
        }
    }

    pub fn tag_key(&self) -> TagKey {
        TagKey::new(self.content_id, self.tag_name.clone())
    }

    /// Due time on the simulated clock. Negative or non-finite timestamps
    /// are due immediately.
    pub fn due_at(&self) -> SimTime {
        if self.timestamp.is_finite() && self.timestamp > 0.0 {
            SimTime::from_millis((self.timestamp * 1000.0).round() as u64)
        } else {
            SimTime::ZERO
        }
    }
}
