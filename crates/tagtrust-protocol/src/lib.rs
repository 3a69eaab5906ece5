//! tagtrust protocol - shared model for subjective tag reputation
//!
//! Defines the passive entities every other crate works with:
//! - Typed identifiers for peers, content, rules, tags and votes
//! - Content items, tags with accumulating provenance, tagging rules
//! - Immutable votes with causal links into a per-peer vote DAG
//! - Protocol-wide constants and the protocol error type

pub mod constants;
pub mod error;
pub mod identity;
pub mod types;

pub use constants::*;
pub use error::*;
pub use identity::*;
pub use types::*;
