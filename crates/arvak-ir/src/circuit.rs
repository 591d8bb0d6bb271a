//! Circuit container and builder API.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit as an ordered list of instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create an empty circuit with no classical bits.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self::with_size(name, num_qubits, 0)
    }

    /// Create an empty circuit with the given register sizes.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            instructions: Vec::new(),
        }
    }

    /// Circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Total number of instructions, unitary or not.
    pub fn num_ops(&self) -> usize {
        self.instructions.len()
    }

    /// Number of unitary gate instructions.
    pub fn gate_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_unitary()).count()
    }

    /// Copy of this circuit's registers and name with a new instruction list.
    ///
    /// The instructions are trusted to reference valid qubits.
    pub fn with_instructions(&self, instructions: Vec<Instruction>) -> Self {
        Self {
            name: self.name.clone(),
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            instructions,
        }
    }

    /// Append a validated instruction.
    pub fn push(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        if let InstructionKind::Gate(gate) = &instruction.kind {
            if gate.num_qubits() != instruction.qubits.len() {
                return Err(IrError::ArityMismatch {
                    gate: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got: instruction.qubits.len(),
                });
            }
            for (i, q) in instruction.qubits.iter().enumerate() {
                if instruction.qubits[..i].contains(q) {
                    return Err(IrError::DuplicateQubit {
                        gate: gate.name().to_string(),
                        qubit: *q,
                    });
                }
            }
        }
        for &qubit in &instruction.qubits {
            self.check_qubit(qubit)?;
        }
        for &clbit in &instruction.clbits {
            if clbit.0 >= self.num_clbits {
                return Err(IrError::InvalidClbit {
                    clbit,
                    num_clbits: self.num_clbits,
                });
            }
        }
        self.instructions.push(instruction);
        Ok(self)
    }

    /// Append a gate.
    pub fn gate(&mut self, gate: StandardGate, qubits: &[QubitId]) -> IrResult<&mut Self> {
        self.push(Instruction::gate(gate, qubits.to_vec()))
    }

    pub fn h(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::H, &[q])
    }

    pub fn x(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::X, &[q])
    }

    pub fn s(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::S, &[q])
    }

    pub fn t(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::T, &[q])
    }

    pub fn rx(&mut self, theta: f64, q: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Rx(theta), &[q])
    }

    pub fn ry(&mut self, theta: f64, q: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Ry(theta), &[q])
    }

    pub fn rz(&mut self, theta: f64, q: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Rz(theta), &[q])
    }

    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CX, &[control, target])
    }

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, q: QubitId, c: ClbitId) -> IrResult<&mut Self> {
        self.push(Instruction::measure(q, c))
    }

    /// Measure every qubit into the classical bit of the same index,
    /// growing the classical register if needed.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        if self.num_clbits < self.num_qubits {
            self.num_clbits = self.num_qubits;
        }
        for q in 0..self.num_qubits {
            self.measure(QubitId(q), ClbitId(q))?;
        }
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::reset(q))
    }

    /// Barrier across all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits = (0..self.num_qubits).map(QubitId).collect();
        self.push(Instruction::barrier(qubits))
    }

    fn check_qubit(&self, qubit: QubitId) -> IrResult<()> {
        if qubit.0 >= self.num_qubits {
            return Err(IrError::InvalidQubit {
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn bell() -> Circuit {
        let mut circuit = Circuit::new("bell", 2);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        circuit
    }

    #[test]
    fn test_builder_chain() {
        let mut circuit = Circuit::new("test", 2);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .rz(PI / 4.0, QubitId(1))
            .unwrap();

        assert_eq!(circuit.num_ops(), 3);
        assert_eq!(circuit.gate_count(), 3);
    }

    #[test]
    fn test_invalid_qubit() {
        let mut circuit = Circuit::new("test", 1);
        let err = circuit.x(QubitId(3)).unwrap_err();
        assert_eq!(
            err,
            IrError::InvalidQubit {
                qubit: QubitId(3),
                num_qubits: 1
            }
        );
    }

    #[test]
    fn test_duplicate_qubit() {
        let mut circuit = Circuit::new("test", 2);
        assert!(matches!(
            circuit.cx(QubitId(1), QubitId(1)),
            Err(IrError::DuplicateQubit { .. })
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut circuit = Circuit::new("test", 2);
        let err = circuit
            .gate(StandardGate::H, &[QubitId(0), QubitId(1)])
            .unwrap_err();
        assert!(matches!(err, IrError::ArityMismatch { expected: 1, got: 2, .. }));
    }

    #[test]
    fn test_measure_all_grows_clbits() {
        let mut circuit = bell();
        assert_eq!(circuit.num_clbits(), 0);
        circuit.measure_all().unwrap();
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.num_ops(), 4);
        assert_eq!(circuit.gate_count(), 2);
    }

    #[test]
    fn test_with_instructions_keeps_registers() {
        let mut circuit = Circuit::with_size("regs", 3, 2);
        circuit.x(QubitId(2)).unwrap();
        let empty = circuit.with_instructions(Vec::new());
        assert_eq!(empty.name(), "regs");
        assert_eq!(empty.num_qubits(), 3);
        assert_eq!(empty.num_clbits(), 2);
        assert_eq!(empty.num_ops(), 0);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let circuit = bell();
        let json = serde_json::to_string(&circuit).unwrap();
        let back: Circuit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, circuit);
    }
}
