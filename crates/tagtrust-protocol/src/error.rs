use thiserror::Error;

use crate::identity::RuleId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid rule {rule}: {reason}")]
    InvalidRule { rule: RuleId, reason: String },

    #[error("Invalid popularity {0}: must be a finite, non-negative weight")]
    InvalidPopularity(f64),
}
