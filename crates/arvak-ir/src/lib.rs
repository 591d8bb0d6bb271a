//! Arvak circuit intermediate representation.
//!
//! A deliberately small circuit model: an ordered list of instructions over
//! a fixed qubit register. Circuits are built with a chaining API:
//!
//! ```
//! use arvak_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::new("ghz", 3);
//! circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?.cx(QubitId(1), QubitId(2))?;
//! circuit.measure_all()?;
//! assert_eq!(circuit.gate_count(), 3);
//! # Ok::<(), arvak_ir::IrError>(())
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use qubit::{ClbitId, QubitId};
