//! Error types for zero-noise extrapolation.

use thiserror::Error;

/// Boxed error returned by an external executor.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by noise scaling, extrapolation and mitigated execution.
///
/// Every failure reaches the caller unchanged; the pipeline never falls back
/// to an unmitigated value.
#[derive(Debug, Error)]
pub enum ZneError {
    #[error("invalid scale factor {0}: must be finite and >= 1")]
    InvalidScaleFactor(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("insufficient data: need at least {required} points, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("fit did not converge: {0}")]
    FitDidNotConverge(String),

    #[error("adaptive factory did not converge within {max_iterations} iterations")]
    ConvergenceTimeout { max_iterations: usize },

    #[error("executor failed: {0}")]
    ExecutorFailure(#[source] BoxError),

    #[error("cannot {operation} while factory is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl ZneError {
    /// Wrap an executor error.
    pub fn executor(err: impl Into<BoxError>) -> Self {
        ZneError::ExecutorFailure(err.into())
    }
}

impl From<serde_yaml::Error> for ZneError {
    fn from(err: serde_yaml::Error) -> Self {
        ZneError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ZneError {
    fn from(err: serde_json::Error) -> Self {
        ZneError::Config(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type ZneResult<T> = Result<T, ZneError>;
