//! Noisy density-matrix simulator.

use std::collections::BTreeMap;

use arvak_ir::{Circuit, InstructionKind};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::density::DensityMatrix;
use crate::error::{SimError, SimResult};
use crate::noise::NoiseModel;
use crate::observable::PauliObservable;

/// Largest register the simulator accepts.
pub const MAX_QUBITS: usize = 10;

/// Density-matrix simulator with depolarizing gate noise.
///
/// Exact expectation values come from [`DensitySimulator::expectation`];
/// [`DensitySimulator::sample_counts`] draws seeded shots, including readout
/// error.
#[derive(Debug, Clone)]
pub struct DensitySimulator {
    noise: NoiseModel,
    seed: u64,
}

impl DensitySimulator {
    /// Create a simulator with the given noise model.
    pub fn new(noise: NoiseModel) -> SimResult<Self> {
        noise.validate()?;
        Ok(Self { noise, seed: 0 })
    }

    /// Noiseless simulator.
    pub fn ideal() -> Self {
        Self {
            noise: NoiseModel::ideal(),
            seed: 0,
        }
    }

    /// Seed for shot sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn noise(&self) -> &NoiseModel {
        &self.noise
    }

    /// Evolve |0…0⟩ through `circuit`.
    ///
    /// Measurements dephase the measured qubit; barriers are ignored.
    #[instrument(level = "debug", skip_all, fields(circuit = circuit.name()))]
    pub fn run(&self, circuit: &Circuit) -> SimResult<DensityMatrix> {
        let num_qubits = circuit.num_qubits();
        if num_qubits > MAX_QUBITS {
            return Err(SimError::TooManyQubits {
                num_qubits,
                max: MAX_QUBITS,
            });
        }

        let mut rho = DensityMatrix::new(num_qubits);
        for instr in circuit.instructions() {
            let qubits: Vec<usize> = instr.qubits.iter().map(|q| q.0 as usize).collect();
            match &instr.kind {
                InstructionKind::Gate(gate) => {
                    rho.apply_gate(gate, &qubits);
                    let p = self.noise.gate_error(qubits.len());
                    for &q in &qubits {
                        rho.depolarize(q, p);
                    }
                }
                InstructionKind::Measure => {
                    for &q in &qubits {
                        rho.dephase(q);
                    }
                }
                InstructionKind::Reset => {
                    for &q in &qubits {
                        rho.reset(q);
                    }
                }
                InstructionKind::Barrier => {}
            }
        }
        debug!(
            qubits = num_qubits,
            ops = circuit.num_ops(),
            purity = rho.purity(),
            "simulation finished"
        );
        Ok(rho)
    }

    /// Exact expectation value of `observable` after `circuit`.
    ///
    /// Readout error does not apply.
    pub fn expectation(&self, circuit: &Circuit, observable: &PauliObservable) -> SimResult<f64> {
        observable.check_qubits(circuit.num_qubits())?;
        Ok(self.run(circuit)?.expectation(observable))
    }

    /// Sample `shots` computational-basis outcomes.
    ///
    /// Keys are bitstrings with qubit 0 as the rightmost character.
    pub fn sample_counts(&self, circuit: &Circuit, shots: u64) -> SimResult<BTreeMap<String, u64>> {
        if shots == 0 {
            return Err(SimError::NoShots);
        }
        let rho = self.run(circuit)?;
        let dist = WeightedIndex::new(rho.probabilities())
            .map_err(|e| SimError::Sampling(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let width = circuit.num_qubits().max(1);
        let flip = self.noise.readout_error;

        let mut counts = BTreeMap::new();
        for _ in 0..shots {
            let mut outcome = dist.sample(&mut rng);
            if flip > 0.0 {
                for q in 0..circuit.num_qubits() {
                    if rng.gen_bool(flip) {
                        outcome ^= 1 << q;
                    }
                }
            }
            *counts
                .entry(format!("{outcome:0width$b}"))
                .or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl Default for DensitySimulator {
    fn default() -> Self {
        Self::ideal()
    }
}
