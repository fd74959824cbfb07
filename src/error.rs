use thiserror::Error;

/// Result type for ddqn operations
pub type Result<T> = std::result::Result<T, DdqnError>;

/// Main error type for the ddqn crate
#[derive(Error, Debug)]
pub enum DdqnError {
    /// Sampling requested before enough transitions were stored
    #[error("Replay underflow: requested {requested} distinct samples but only {available} transitions are stored (need strictly more)")]
    Underflow {
        requested: usize,
        available: usize,
    },

    /// Observation or batch shape inconsistent with what was allocated
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Action outside of the discrete action space
    #[error("Invalid action {action}: must be less than {num_actions}")]
    InvalidAction {
        action: usize,
        num_actions: usize,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Numerical computation errors (divergence, NaN)
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Failure reported by an environment
    #[error("Environment error: {0}")]
    Environment(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for DdqnError {
    fn from(err: bincode::Error) -> Self {
        DdqnError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DdqnError {
    fn from(err: serde_json::Error) -> Self {
        DdqnError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl DdqnError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DdqnError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DdqnError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for the sampling precondition failure
    pub fn is_underflow(&self) -> bool {
        matches!(self, DdqnError::Underflow { .. })
    }
}
