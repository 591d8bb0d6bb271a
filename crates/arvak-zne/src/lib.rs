//! Arvak zero-noise extrapolation.
//!
//! This crate estimates the noiseless expectation value of a circuit by
//! running it at several amplified noise levels and extrapolating the
//! results back to zero noise.
//!
//! # Features
//!
//! - **Noise Scaling**: Unitary folding, either of the whole circuit
//!   ([`NoiseScaler::Global`]) or gate by gate ([`NoiseScaler::Local`])
//! - **Extrapolation**: Linear, polynomial, exponential and Richardson models
//! - **Factories**: Static scale-factor sequences or adaptive sampling with a
//!   pluggable stopping criterion
//! - **Mitigated Executors**: Wrap any executor so that it returns
//!   zero-noise estimates, sync or async
//! - **Configuration**: YAML/JSON via [`ZneConfig`]
//!
//! # Example
//!
//! ```
//! use arvak_ir::{Circuit, QubitId};
//! use arvak_zne::{Factory, NoiseScaler, execute_with_zne};
//!
//! let mut circuit = Circuit::new("demo", 1);
//! circuit.h(QubitId(0))?.h(QubitId(0))?;
//!
//! // Stand-in for a noisy device: fidelity drops with circuit length.
//! let executor = |c: &Circuit| -> Result<f64, std::convert::Infallible> {
//!     Ok(1.0 - 0.02 * c.num_ops() as f64)
//! };
//!
//! let factory = Factory::linear(vec![1.0, 3.0, 5.0])?;
//! let estimate = execute_with_zne(&circuit, &executor, factory, &NoiseScaler::Global)?;
//! assert!((estimate - 1.0).abs() < 1e-9);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod extrapolation;
pub mod factory;
pub mod mitigate;
pub mod scaling;

// Re-exports
pub use config::{ScalePolicy, ZneConfig};
pub use error::{BoxError, ZneError, ZneResult};
pub use executor::{
    AsyncExecutor, Counts, CountsExecutor, Executor, ExpectationFromCounts, ZObservable,
};
pub use extrapolation::{DataPoint, Extrapolation, FitResult};
pub use factory::{AdaptiveConfig, EstimateStabilized, Factory, FactoryState, StoppingCriterion};
pub use mitigate::{
    MitigatedExecutor, ZneOutcome, execute_with_zne, execute_with_zne_async,
    execute_with_zne_detailed, mitigate_executor, run_factory,
};
pub use scaling::{FoldOrder, Foldable, NoiseScaler, check_scale_factor, fold_gates, fold_global};
