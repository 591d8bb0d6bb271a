//! Circuit instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gate::StandardGate;
use crate::qubit::{ClbitId, QubitId};

/// The kind of operation an instruction performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A unitary gate.
    Gate(StandardGate),
    /// Z-basis measurement into a classical bit.
    Measure,
    /// Reset to |0⟩.
    Reset,
    /// Scheduling barrier.
    Barrier,
}

/// A single operation applied to a set of qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// What the instruction does.
    pub kind: InstructionKind,
    /// Qubits the instruction acts on, in gate order.
    pub qubits: Vec<QubitId>,
    /// Classical bits written by the instruction.
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: StandardGate, qubits: Vec<QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate),
            qubits,
            clbits: Vec::new(),
        }
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
            clbits: Vec::new(),
        }
    }

    /// Create a barrier over the given qubits.
    pub fn barrier(qubits: Vec<QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits,
            clbits: Vec::new(),
        }
    }

    /// The gate, if this is a unitary instruction.
    pub fn as_gate(&self) -> Option<&StandardGate> {
        match &self.kind {
            InstructionKind::Gate(gate) => Some(gate),
            _ => None,
        }
    }

    /// Whether the instruction is unitary.
    pub fn is_unitary(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// The logical inverse, or `None` for non-unitary instructions.
    pub fn inverse(&self) -> Option<Instruction> {
        self.as_gate()
            .map(|gate| Instruction::gate(gate.inverse(), self.qubits.clone()))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qubits: Vec<String> = self.qubits.iter().map(|q| q.to_string()).collect();
        match &self.kind {
            InstructionKind::Gate(gate) => write!(f, "{} {}", gate, qubits.join(", ")),
            InstructionKind::Measure => match self.clbits.first() {
                Some(c) => write!(f, "{} = measure {}", c, qubits.join(", ")),
                None => write!(f, "measure {}", qubits.join(", ")),
            },
            InstructionKind::Reset => write!(f, "reset {}", qubits.join(", ")),
            InstructionKind::Barrier => write!(f, "barrier {}", qubits.join(", ")),
        }
    }
}
