//! Error types for circuit construction.

use thiserror::Error;

use crate::qubit::{ClbitId, QubitId};

/// Errors raised while building or inspecting a circuit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IrError {
    #[error("qubit {qubit} out of range for {num_qubits}-qubit circuit")]
    InvalidQubit { qubit: QubitId, num_qubits: u32 },

    #[error("classical bit {clbit} out of range for circuit with {num_clbits} clbits")]
    InvalidClbit { clbit: ClbitId, num_clbits: u32 },

    #[error("gate {gate} applied to duplicate qubit {qubit}")]
    DuplicateQubit { gate: String, qubit: QubitId },

    #[error("gate {gate} expects {expected} qubits, got {got}")]
    ArityMismatch {
        gate: String,
        expected: usize,
        got: usize,
    },
}

/// Result alias for IR operations.
pub type IrResult<T> = Result<T, IrError>;
