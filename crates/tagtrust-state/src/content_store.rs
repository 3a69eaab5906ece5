//! Local content store.
//!
//! Content enters the store either from the driver (with a popularity weight)
//! or as a stub the first time a gossiped vote references it. Items are never
//! removed.

use std::collections::BTreeMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tagtrust_protocol::{Content, ContentId};

/// Content items known to one peer, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    items: BTreeMap<ContentId, Content>,
}

impl ContentStore {
    /// Create a new empty content store.
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Add a content item.
    ///
    /// If the id is already present (for example as a stub created from a
    /// gossiped vote), the known tags are kept and only the popularity is
    /// taken from `content`. Returns true if the item was new.
    pub fn add_content(&mut self, content: Content) -> bool {
        match self.items.get_mut(&content.id) {
            Some(existing) => {
                existing.popularity = content.popularity;
                false
            }
            None => {
                self.items.insert(content.id, content);
                true
            }
        }
    }

    /// Get the item with `id`, creating a stub if it is unknown.
    pub fn ensure(&mut self, id: ContentId) -> &mut Content {
        self.items.entry(id).or_insert_with(|| {
            tracing::debug!(content = %id, "Created stub content");
            Content::stub(id)
        })
    }

    pub fn get(&self, id: ContentId) -> Option<&Content> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ContentId) -> Option<&mut Content> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ContentId) -> bool {
        self.items.contains_key(&id)
    }

    /// All content ids, ascending.
    pub fn ids(&self) -> Vec<ContentId> {
        self.items.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Content> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pick an item with probability proportional to its popularity.
    ///
    /// Returns `None` when the store is empty or every weight is zero.
    pub fn random_by_popularity<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<ContentId> {
        let ids: Vec<ContentId> = self.items.keys().copied().collect();
        let weights = self.items.values().map(|c| c.popularity.max(0.0));
        let dist = WeightedIndex::new(weights).ok()?;
        Some(ids[dist.sample(rng)])
    }
}
