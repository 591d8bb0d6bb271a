//! Arvak local simulator backend.
//!
//! A dense density-matrix simulator with configurable depolarizing and
//! readout noise. Intended for testing error-mitigation pipelines on small
//! circuits, up to [`MAX_QUBITS`] qubits.
//!
//! # Example
//!
//! ```
//! use arvak_adapter_sim::{DensitySimulator, NoiseModel, PauliObservable};
//! use arvak_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::new("flip", 1);
//! circuit.x(QubitId(0))?;
//!
//! let sim = DensitySimulator::new(NoiseModel::depolarizing(0.1))?;
//! let z = sim.expectation(&circuit, &PauliObservable::z(0))?;
//! assert!((z + 0.9).abs() < 1e-12);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod density;
pub mod error;
pub mod noise;
pub mod observable;
pub mod simulator;

pub use density::DensityMatrix;
pub use error::{SimError, SimResult};
pub use noise::NoiseModel;
pub use observable::{Pauli, PauliObservable, PauliTerm};
pub use simulator::{DensitySimulator, MAX_QUBITS};
