//! Error types for codegraph-order
//!
//! Only conditions the analysis cannot recover from surface here. Unknown
//! expression kinds, missing seeds and unresolved calls are logged and
//! degrade precision instead.

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::order_analysis::infrastructure::PolicyParseError;

/// Main error type for order analysis
#[derive(Debug, Error)]
pub enum OrderAnalysisError {
    /// Internal invariant broken (e.g. a state with inconsistent flags)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Saturation did not converge within the configured budget
    #[error("Saturation exceeded {max_iterations} iterations (stopped at {iterations})")]
    IterationLimit {
        iterations: usize,
        max_iterations: usize,
    },

    /// Policy could not be loaded
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OrderAnalysisError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        OrderAnalysisError::InvariantViolation(msg.into())
    }
}

/// Result type alias for order analysis operations
pub type Result<T> = std::result::Result<T, OrderAnalysisError>;
