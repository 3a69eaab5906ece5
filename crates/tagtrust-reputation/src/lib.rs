//! tagtrust reputation - subjective trust and reputation from a local ledger
//!
//! Turns one peer's vote ledger into scores, in a fixed order:
//! 1. Pairwise similarity from overlapping voting histories
//! 2. Transitive trust ("flow") via max-flow over the similarity graph
//! 3. Tag reputation from trust-weighted votes
//! 4. Rule reputation from the votes on the tags a rule generated
//! 5. User reputation from authored tags and flow
//! 6. Tag weight blending the tag's reputation with its contributors'

pub mod aggregator;
pub mod flow;
pub mod similarity;
pub mod trust;

pub use aggregator::{tag_weight, AggregatorConfig, ReputationAggregator, ThresholdMetric};
pub use flow::FlowGraph;
pub use similarity::{compute_similarity, EvidenceKey};
pub use trust::TrustEngine;
