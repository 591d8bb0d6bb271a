//! Noise model.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Gate and readout noise applied by the simulator.
///
/// After every gate, each qubit the gate touches goes through a depolarizing
/// channel `ρ → (1 - p) ρ + p I/2 ⊗ Tr_q ρ`. Readout errors flip each
/// measured bit independently with probability `readout_error`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseModel {
    /// Depolarizing probability after single-qubit gates.
    pub single_qubit_depolarizing: f64,
    /// Depolarizing probability, per qubit, after two-qubit gates.
    pub two_qubit_depolarizing: f64,
    /// Bit-flip probability at readout.
    pub readout_error: f64,
}

impl NoiseModel {
    /// No noise.
    pub fn ideal() -> Self {
        Self::default()
    }

    /// The same depolarizing probability after every gate.
    pub fn depolarizing(p: f64) -> Self {
        Self {
            single_qubit_depolarizing: p,
            two_qubit_depolarizing: p,
            readout_error: 0.0,
        }
    }

    pub fn with_two_qubit_depolarizing(mut self, p: f64) -> Self {
        self.two_qubit_depolarizing = p;
        self
    }

    pub fn with_readout_error(mut self, p: f64) -> Self {
        self.readout_error = p;
        self
    }

    /// Check that every probability lies in `[0, 1]`.
    pub fn validate(&self) -> SimResult<()> {
        for (name, p) in [
            ("single_qubit_depolarizing", self.single_qubit_depolarizing),
            ("two_qubit_depolarizing", self.two_qubit_depolarizing),
            ("readout_error", self.readout_error),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidNoise(format!(
                    "{name} = {p} is not a probability"
                )));
            }
        }
        Ok(())
    }

    /// True if the model adds no noise at all.
    pub fn is_ideal(&self) -> bool {
        self.single_qubit_depolarizing == 0.0
            && self.two_qubit_depolarizing == 0.0
            && self.readout_error == 0.0
    }

    /// Depolarizing probability after a gate on `arity` qubits.
    pub fn gate_error(&self, arity: usize) -> f64 {
        if arity >= 2 {
            self.two_qubit_depolarizing
        } else {
            self.single_qubit_depolarizing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(NoiseModel::ideal().validate().is_ok());
        assert!(NoiseModel::depolarizing(0.05).validate().is_ok());
        assert!(NoiseModel::depolarizing(1.5).validate().is_err());
        assert!(
            NoiseModel::ideal()
                .with_readout_error(-0.1)
                .validate()
                .is_err()
        );
        assert!(NoiseModel::depolarizing(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_gate_error() {
        let noise = NoiseModel::depolarizing(0.01).with_two_qubit_depolarizing(0.03);
        assert_eq!(noise.gate_error(1), 0.01);
        assert_eq!(noise.gate_error(2), 0.03);
        assert!(!noise.is_ideal());
        assert!(NoiseModel::ideal().is_ideal());
    }

    #[test]
    fn test_serde_partial() {
        let noise: NoiseModel = serde_json::from_str(r#"{"readout_error": 0.02}"#).unwrap();
        assert_eq!(noise.readout_error, 0.02);
        assert_eq!(noise.single_qubit_depolarizing, 0.0);
    }
}
