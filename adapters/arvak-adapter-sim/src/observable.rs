//! Pauli observables.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

/// A weighted tensor product of Paulis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliTerm {
    pub coefficient: f64,
    pub operators: Vec<(usize, Pauli)>,
}

impl PauliTerm {
    pub fn new(coefficient: f64, operators: Vec<(usize, Pauli)>) -> Self {
        Self {
            coefficient,
            operators,
        }
    }

    /// Parse a label such as `"XIZ"`. The rightmost character acts on
    /// qubit 0.
    pub fn from_label(coefficient: f64, label: &str) -> SimResult<Self> {
        let mut operators = Vec::new();
        for (qubit, c) in label.chars().rev().enumerate() {
            let pauli = match c {
                'I' => continue,
                'X' => Pauli::X,
                'Y' => Pauli::Y,
                'Z' => Pauli::Z,
                other => {
                    return Err(SimError::InvalidObservable(format!(
                        "unknown Pauli '{other}' in label '{label}'"
                    )));
                }
            };
            operators.push((qubit, pauli));
        }
        Ok(Self::new(coefficient, operators))
    }

    /// Apply the Pauli string to basis state `index`.
    ///
    /// Returns the image index and the accumulated phase.
    pub(crate) fn apply(&self, index: usize) -> (usize, Complex64) {
        let mut new_index = index;
        let mut phase = Complex64::new(1.0, 0.0);

        for &(qubit, pauli) in &self.operators {
            let bit = (index >> qubit) & 1;
            match pauli {
                Pauli::I => {}
                Pauli::X => {
                    new_index ^= 1 << qubit;
                }
                Pauli::Y => {
                    new_index ^= 1 << qubit;
                    if bit == 0 {
                        phase *= Complex64::new(0.0, 1.0);
                    } else {
                        phase *= Complex64::new(0.0, -1.0);
                    }
                }
                Pauli::Z => {
                    if bit == 1 {
                        phase = -phase;
                    }
                }
            }
        }

        (new_index, phase)
    }
}

/// Hermitian observable as a sum of Pauli terms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PauliObservable {
    terms: Vec<PauliTerm>,
}

impl PauliObservable {
    pub fn new(terms: Vec<PauliTerm>) -> Self {
        Self { terms }
    }

    /// Pauli Z on one qubit.
    pub fn z(qubit: usize) -> Self {
        Self::new(vec![PauliTerm::new(1.0, vec![(qubit, Pauli::Z)])])
    }

    /// Pauli X on one qubit.
    pub fn x(qubit: usize) -> Self {
        Self::new(vec![PauliTerm::new(1.0, vec![(qubit, Pauli::X)])])
    }

    /// Z⊗Z on two qubits.
    pub fn zz(a: usize, b: usize) -> Self {
        Self::new(vec![PauliTerm::new(
            1.0,
            vec![(a, Pauli::Z), (b, Pauli::Z)],
        )])
    }

    /// Add a term.
    pub fn with_term(mut self, term: PauliTerm) -> Self {
        self.terms.push(term);
        self
    }

    pub fn terms(&self) -> &[PauliTerm] {
        &self.terms
    }

    /// Check that every operator acts on one of `num_qubits` qubits.
    pub fn check_qubits(&self, num_qubits: usize) -> SimResult<()> {
        let out_of_range = self
            .terms
            .iter()
            .flat_map(|t| t.operators.iter())
            .find(|(q, _)| *q >= num_qubits);
        match out_of_range {
            Some((q, _)) => Err(SimError::InvalidObservable(format!(
                "operator on qubit {q}, circuit has {num_qubits}"
            ))),
            None => Ok(()),
        }
    }
}
