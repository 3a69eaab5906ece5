//! tagtrust state - the local stores each peer owns exclusively
//!
//! Provides the per-peer data layer:
//! - Content store with popularity-weighted sampling
//! - Tag store keyed by (content, name), preserving creation order
//! - Rule store holding this peer's copies of the tagging rules
//! - Vote ledger: deduplicated votes, lookup indices and a causal vote DAG with tip selection

pub mod content_store;
pub mod rule_store;
pub mod tag_store;
pub mod vote_ledger;

pub use content_store::ContentStore;
pub use rule_store::RuleStore;
pub use tag_store::TagStore;
pub use vote_ledger::VoteLedger;
