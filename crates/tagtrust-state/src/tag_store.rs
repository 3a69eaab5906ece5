//! Local tag store.
//!
//! Tags are keyed by `(content, name)` and kept in creation order. Authors
//! and generating rules only ever accumulate.

use std::collections::{BTreeSet, HashMap};

use tagtrust_protocol::{ContentId, PeerId, RuleId, Tag, TagKey};

/// Tags known to one peer.
#[derive(Debug, Clone, Default)]
pub struct TagStore {
    /// Tags in creation order.
    tags: Vec<Tag>,
    /// Key -> position in `tags`.
    index: HashMap<TagKey, usize>,
}

impl TagStore {
    pub fn new() -> Self {
        Self {
            tags: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Get the tag for `key`, creating an empty one if needed.
    ///
    /// The boolean is true when the tag was created by this call.
    pub fn get_or_create(&mut self, key: TagKey) -> (&mut Tag, bool) {
        if let Some(&idx) = self.index.get(&key) {
            return (&mut self.tags[idx], false);
        }
        let idx = self.tags.len();
        self.index.insert(key.clone(), idx);
        self.tags.push(Tag::new(key));
        (&mut self.tags[idx], true)
    }

    /// Insert `tag` if its key is unknown. Returns false (and leaves the
    /// existing tag untouched) otherwise.
    pub fn insert(&mut self, tag: Tag) -> bool {
        if self.index.contains_key(&tag.key) {
            return false;
        }
        self.index.insert(tag.key.clone(), self.tags.len());
        self.tags.push(tag);
        true
    }

    pub fn get(&self, key: &TagKey) -> Option<&Tag> {
        self.index.get(key).map(|&idx| &self.tags[idx])
    }

    pub fn get_mut(&mut self, key: &TagKey) -> Option<&mut Tag> {
        match self.index.get(key) {
            Some(&idx) => Some(&mut self.tags[idx]),
            None => None,
        }
    }

    pub fn contains(&self, key: &TagKey) -> bool {
        self.index.contains_key(key)
    }

    /// Record `author` as an author of the tag. Returns true if newly added.
    pub fn add_author(&mut self, key: &TagKey, author: PeerId) -> bool {
        self.get_mut(key)
            .map(|tag| tag.authors.insert(author))
            .unwrap_or(false)
    }

    /// Union `authors` into the tag's author set. Returns how many were new.
    pub fn merge_authors(&mut self, key: &TagKey, authors: &BTreeSet<PeerId>) -> usize {
        match self.get_mut(key) {
            Some(tag) => authors
                .iter()
                .filter(|author| tag.authors.insert(**author))
                .count(),
            None => 0,
        }
    }

    /// Record `rule` as a generator of the tag. Returns true if newly added.
    pub fn add_rule(&mut self, key: &TagKey, rule: RuleId) -> bool {
        self.get_mut(key)
            .map(|tag| tag.rules.insert(rule))
            .unwrap_or(false)
    }

    /// All tags in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tag> {
        self.tags.iter_mut()
    }

    /// Tags on one content item, in creation order.
    pub fn tags_for_content(&self, content_id: ContentId) -> Vec<&Tag> {
        self.tags
            .iter()
            .filter(|tag| tag.key.content_id == content_id)
            .collect()
    }

    /// Tags that list `author` among their authors.
    pub fn tags_authored_by(&self, author: PeerId) -> Vec<&Tag> {
        self.tags
            .iter()
            .filter(|tag| tag.authors.contains(&author))
            .collect()
    }

    /// Tags that `rule` generated.
    pub fn tags_generated_by(&self, rule: RuleId) -> Vec<&Tag> {
        self.tags
            .iter()
            .filter(|tag| tag.rules.contains(&rule))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
