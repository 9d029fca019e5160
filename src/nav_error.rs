//! NavError: Unified error type for cluster-nav public APIs
//!
//! Every fallible operation in the crate returns this type. Navigation
//! mistakes (bad ids, exhausted budgets) are recoverable and reported to the
//! caller; linkage corruption is fatal for the request that hit it.

use thiserror::Error;

/// Unified error type for cluster navigation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavError {
    /// A request parameter is outside its configured range.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    /// The cluster id is not part of the current visible set.
    #[error("cluster `{0}` is not visible")]
    ClusterNotFound(String),
    /// No visible entry contains the requested leaf.
    #[error("leaf {0} is not in any visible subtree")]
    LeafNotVisible(usize),
    /// The account id is not a leaf of the loaded artifact.
    #[error("unknown account `{0}`")]
    UnknownAccount(String),
    /// The edit would grow the visible set past its budget.
    #[error("budget exhausted: {required} visible entries needed, budget is {budget}")]
    BudgetExhausted { budget: usize, required: usize },
    /// An internal node id has no merge row behind it.
    #[error("linkage has no merge row for node {0}")]
    MissingMergeRow(usize),
    /// The linkage matrix is malformed.
    #[error("inconsistent linkage: {0}")]
    InconsistentLinkage(String),
    /// A decomposition did not partition the leaves of the cluster it replaces.
    #[error("decomposition of `{cluster}` is not a partition: {reason}")]
    PartitionViolation { cluster: String, reason: String },
    /// Label or tag persistence failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl NavError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        NavError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable reason code for `{ok: false, reason}` payloads.
    pub fn reason(&self) -> &'static str {
        match self {
            NavError::Validation { .. } => "validation",
            NavError::ClusterNotFound(_) | NavError::UnknownAccount(_) => "not_found",
            NavError::LeafNotVisible(_) => "leaf_not_in_visible_subtrees",
            NavError::BudgetExhausted { .. } => "budget_exhausted",
            NavError::MissingMergeRow(_)
            | NavError::InconsistentLinkage(_)
            | NavError::PartitionViolation { .. } => "structural",
            NavError::Persistence(_) => "persistence",
        }
    }

    /// True when the error indicates a corrupted artifact rather than a
    /// navigation mistake.
    pub fn is_fatal(&self) -> bool {
        self.reason() == "structural"
    }
}

impl From<std::io::Error> for NavError {
    fn from(e: std::io::Error) -> Self {
        NavError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for NavError {
    fn from(e: serde_json::Error) -> Self {
        NavError::Persistence(e.to_string())
    }
}
