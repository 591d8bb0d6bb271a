//! Error types for the simulator.

use thiserror::Error;

/// Simulator errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("circuit has {num_qubits} qubits, simulator supports at most {max}")]
    TooManyQubits { num_qubits: usize, max: usize },

    #[error("invalid noise model: {0}")]
    InvalidNoise(String),

    #[error("invalid observable: {0}")]
    InvalidObservable(String),

    #[error("shot count must be positive")]
    NoShots,

    #[error("cannot sample: {0}")]
    Sampling(String),
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
