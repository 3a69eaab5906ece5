use std::collections::BTreeMap;

use tagtrust_protocol::{Rule, RuleId};

/// This peer's copies of the tagging rules, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: BTreeMap<RuleId, Rule>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Add or replace a rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.insert(rule.id, rule);
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    pub fn get_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
        self.rules.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.rules.values_mut()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
