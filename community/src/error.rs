use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CommunityError>;

/// Errors raised by the community detection engines and the detector facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommunityError {
    /// A parameter or input value was rejected before any work started.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The graph has no nodes.
    #[error("graph contains no nodes")]
    EmptyGraph,

    /// Results were requested from a detector that has not been fitted.
    #[error("detector is not fitted yet, call `fit` before querying communities")]
    NotFitted,

    /// A queried node is not part of the fitted graph.
    #[error("node {0} is not part of the fitted graph")]
    UnknownNode(String),

    /// An internal consistency check failed. The run cannot continue.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The pass or time budget ran out before convergence.
    #[error("budget exhausted after {passes} passes")]
    BudgetExhausted {
        /// Number of passes started before the budget ran out.
        passes: usize,
    },
}

impl CommunityError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        CommunityError::Configuration(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        CommunityError::InvariantViolation(msg.into())
    }
}
