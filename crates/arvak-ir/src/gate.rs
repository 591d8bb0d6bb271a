//! Standard gate set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard unitary gates with bound (numeric) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity.
    I,
    /// Hadamard.
    H,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
    /// Phase gate, sqrt(Z).
    S,
    /// Inverse phase gate.
    Sdg,
    /// T gate, fourth root of Z.
    T,
    /// Inverse T gate.
    Tdg,
    /// Rotation around X.
    Rx(f64),
    /// Rotation around Y.
    Ry(f64),
    /// Rotation around Z.
    Rz(f64),
    /// Phase shift diag(1, e^{iθ}).
    Phase(f64),
    /// Controlled-X. Qubit order is (control, target).
    CX,
    /// Controlled-Z.
    CZ,
    /// Swap.
    Swap,
    /// ZZ interaction exp(-i θ/2 Z⊗Z).
    Rzz(f64),
}

impl StandardGate {
    /// Lowercase OpenQASM-style name.
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::H => "h",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::Phase(_) => "p",
            StandardGate::CX => "cx",
            StandardGate::CZ => "cz",
            StandardGate::Swap => "swap",
            StandardGate::Rzz(_) => "rzz",
        }
    }

    /// Number of qubits the gate acts on.
    pub fn num_qubits(&self) -> usize {
        match self {
            StandardGate::CX | StandardGate::CZ | StandardGate::Swap | StandardGate::Rzz(_) => 2,
            _ => 1,
        }
    }

    /// The logical inverse of this gate.
    pub fn inverse(&self) -> StandardGate {
        match *self {
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::Rx(theta) => StandardGate::Rx(-theta),
            StandardGate::Ry(theta) => StandardGate::Ry(-theta),
            StandardGate::Rz(theta) => StandardGate::Rz(-theta),
            StandardGate::Phase(theta) => StandardGate::Phase(-theta),
            StandardGate::Rzz(theta) => StandardGate::Rzz(-theta),
            // Self-inverse.
            gate => gate,
        }
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandardGate::Rx(theta)
            | StandardGate::Ry(theta)
            | StandardGate::Rz(theta)
            | StandardGate::Phase(theta)
            | StandardGate::Rzz(theta) => write!(f, "{}({:.4})", self.name(), theta),
            _ => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_pairs() {
        assert_eq!(StandardGate::S.inverse(), StandardGate::Sdg);
        assert_eq!(StandardGate::Tdg.inverse(), StandardGate::T);
        assert_eq!(StandardGate::Rx(0.3).inverse(), StandardGate::Rx(-0.3));
        assert_eq!(StandardGate::Rzz(1.2).inverse(), StandardGate::Rzz(-1.2));
    }

    #[test]
    fn test_self_inverse() {
        for gate in [StandardGate::H, StandardGate::X, StandardGate::CX, StandardGate::Swap] {
            assert_eq!(gate.inverse(), gate);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", StandardGate::H), "h");
        assert_eq!(format!("{}", StandardGate::Ry(0.5)), "ry(0.5000)");
    }

    #[test]
    fn test_arity() {
        assert_eq!(StandardGate::Rz(0.1).num_qubits(), 1);
        assert_eq!(StandardGate::CZ.num_qubits(), 2);
    }
}
