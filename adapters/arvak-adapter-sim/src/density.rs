//! Dense density-matrix state.

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use arvak_ir::StandardGate;
use num_complex::Complex64;

use crate::observable::PauliObservable;

type Matrix2 = [[Complex64; 2]; 2];
type Matrix4 = [[Complex64; 4]; 4];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn phase(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

/// Density matrix of `n` qubits, stored row-major.
///
/// Basis index bit `q` is the state of qubit `q`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrix {
    num_qubits: usize,
    data: Vec<Complex64>,
}

impl DensityMatrix {
    /// The all-zeros state |0…0⟩⟨0…0|.
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut data = vec![ZERO; dim * dim];
        data[0] = ONE;
        Self { num_qubits, data }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Hilbert-space dimension.
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Entry `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.dim() + col]
    }

    pub fn trace(&self) -> f64 {
        (0..self.dim()).map(|i| self.get(i, i).re).sum()
    }

    /// Tr(ρ²); 1 for pure states.
    pub fn purity(&self) -> f64 {
        self.data.iter().map(|z| z.norm_sqr()).sum()
    }

    /// Measurement probabilities in the computational basis.
    pub fn probabilities(&self) -> Vec<f64> {
        (0..self.dim()).map(|i| self.get(i, i).re.max(0.0)).collect()
    }

    /// Tr(ρ O).
    pub fn expectation(&self, observable: &PauliObservable) -> f64 {
        let mut total = 0.0;
        for term in observable.terms() {
            let mut value = ZERO;
            for k in 0..self.dim() {
                let (j, ph) = term.apply(k);
                value += ph * self.get(k, j);
            }
            total += term.coefficient * value.re;
        }
        total
    }

    /// Apply `gate` to `qubits`: ρ → U ρ U†.
    pub fn apply_gate(&mut self, gate: &StandardGate, qubits: &[usize]) {
        match gate {
            StandardGate::CX => self.apply_two(&permutation([0, 1, 3, 2]), qubits[0], qubits[1]),
            StandardGate::CZ => self.apply_two(&diagonal([ONE, ONE, ONE, -ONE]), qubits[0], qubits[1]),
            StandardGate::Swap => {
                self.apply_two(&permutation([0, 2, 1, 3]), qubits[0], qubits[1])
            }
            StandardGate::Rzz(theta) => {
                let (a, b) = (phase(-theta / 2.0), phase(theta / 2.0));
                self.apply_two(&diagonal([a, b, b, a]), qubits[0], qubits[1])
            }
            single => self.apply_single(&single_qubit_matrix(single), qubits[0]),
        }
    }

    /// Local depolarizing channel on `qubit`: ρ → (1 - p) ρ + p I/2 ⊗ Tr_q ρ.
    pub fn depolarize(&mut self, qubit: usize, p: f64) {
        if p == 0.0 {
            return;
        }
        let dim = self.dim();
        let mask = 1 << qubit;
        let keep = 1.0 - p / 2.0;
        let mix = p / 2.0;
        for i in (0..dim).filter(|i| i & mask == 0) {
            for j in (0..dim).filter(|j| j & mask == 0) {
                let (i1, j1) = (i | mask, j | mask);
                let a = self.data[i * dim + j];
                let d = self.data[i1 * dim + j1];
                self.data[i * dim + j] = a * keep + d * mix;
                self.data[i1 * dim + j1] = d * keep + a * mix;
                self.data[i * dim + j1] *= 1.0 - p;
                self.data[i1 * dim + j] *= 1.0 - p;
            }
        }
    }

    /// Non-selective Z measurement of `qubit`: drop its coherences.
    pub fn dephase(&mut self, qubit: usize) {
        let dim = self.dim();
        let mask = 1 << qubit;
        for i in 0..dim {
            for j in 0..dim {
                if (i ^ j) & mask != 0 {
                    self.data[i * dim + j] = ZERO;
                }
            }
        }
    }

    /// Reset `qubit` to |0⟩.
    pub fn reset(&mut self, qubit: usize) {
        let dim = self.dim();
        let mask = 1 << qubit;
        for i in (0..dim).filter(|i| i & mask == 0) {
            for j in (0..dim).filter(|j| j & mask == 0) {
                let (i1, j1) = (i | mask, j | mask);
                let excited = self.data[i1 * dim + j1];
                self.data[i * dim + j] += excited;
                self.data[i1 * dim + j1] = ZERO;
                self.data[i * dim + j1] = ZERO;
                self.data[i1 * dim + j] = ZERO;
            }
        }
    }

    fn apply_single(&mut self, u: &Matrix2, q: usize) {
        let dim = self.dim();
        let mask = 1 << q;
        // U ρ
        for col in 0..dim {
            for i in (0..dim).filter(|i| i & mask == 0) {
                let (a, b) = (self.data[i * dim + col], self.data[(i | mask) * dim + col]);
                self.data[i * dim + col] = u[0][0] * a + u[0][1] * b;
                self.data[(i | mask) * dim + col] = u[1][0] * a + u[1][1] * b;
            }
        }
        // (U ρ) U†
        for row in 0..dim {
            for j in (0..dim).filter(|j| j & mask == 0) {
                let (a, b) = (self.data[row * dim + j], self.data[row * dim + (j | mask)]);
                self.data[row * dim + j] = a * u[0][0].conj() + b * u[0][1].conj();
                self.data[row * dim + (j | mask)] = a * u[1][0].conj() + b * u[1][1].conj();
            }
        }
    }

    /// Local index of a two-qubit block is `2 * bit(q0) + bit(q1)`.
    fn apply_two(&mut self, u: &Matrix4, q0: usize, q1: usize) {
        let dim = self.dim();
        let (m0, m1) = (1 << q0, 1 << q1);
        let block = |base: usize| [base, base | m1, base | m0, base | m0 | m1];

        for base in (0..dim).filter(|i| i & (m0 | m1) == 0) {
            let idx = block(base);
            for col in 0..dim {
                let v = idx.map(|i| self.data[i * dim + col]);
                for (l, &i) in idx.iter().enumerate() {
                    self.data[i * dim + col] = (0..4).map(|k| u[l][k] * v[k]).sum();
                }
            }
            for row in 0..dim {
                let w = idx.map(|j| self.data[row * dim + j]);
                for (l, &j) in idx.iter().enumerate() {
                    self.data[row * dim + j] = (0..4).map(|k| w[k] * u[l][k].conj()).sum();
                }
            }
        }
    }
}

fn single_qubit_matrix(gate: &StandardGate) -> Matrix2 {
    let h = FRAC_1_SQRT_2;
    match *gate {
        StandardGate::H => [[c(h, 0.0), c(h, 0.0)], [c(h, 0.0), c(-h, 0.0)]],
        StandardGate::X => [[ZERO, ONE], [ONE, ZERO]],
        StandardGate::Y => [[ZERO, c(0.0, -1.0)], [c(0.0, 1.0), ZERO]],
        StandardGate::Z => [[ONE, ZERO], [ZERO, -ONE]],
        StandardGate::S => [[ONE, ZERO], [ZERO, c(0.0, 1.0)]],
        StandardGate::Sdg => [[ONE, ZERO], [ZERO, c(0.0, -1.0)]],
        StandardGate::T => [[ONE, ZERO], [ZERO, phase(FRAC_PI_4)]],
        StandardGate::Tdg => [[ONE, ZERO], [ZERO, phase(-FRAC_PI_4)]],
        StandardGate::Rx(theta) => {
            let (cs, sn) = ((theta / 2.0).cos(), (theta / 2.0).sin());
            [[c(cs, 0.0), c(0.0, -sn)], [c(0.0, -sn), c(cs, 0.0)]]
        }
        StandardGate::Ry(theta) => {
            let (cs, sn) = ((theta / 2.0).cos(), (theta / 2.0).sin());
            [[c(cs, 0.0), c(-sn, 0.0)], [c(sn, 0.0), c(cs, 0.0)]]
        }
        StandardGate::Rz(theta) => [[phase(-theta / 2.0), ZERO], [ZERO, phase(theta / 2.0)]],
        StandardGate::Phase(theta) => [[ONE, ZERO], [ZERO, phase(theta)]],
        _ => [[ONE, ZERO], [ZERO, ONE]],
    }
}

fn permutation(map: [usize; 4]) -> Matrix4 {
    let mut u = [[ZERO; 4]; 4];
    for (from, &to) in map.iter().enumerate() {
        u[to][from] = ONE;
    }
    u
}

fn diagonal(d: [Complex64; 4]) -> Matrix4 {
    let mut u = [[ZERO; 4]; 4];
    for (i, &v) in d.iter().enumerate() {
        u[i][i] = v;
    }
    u
}
