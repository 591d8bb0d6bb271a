//! Executor abstractions.
//!
//! An executor turns a circuit into a scalar expectation value. Any closure
//! `Fn(&C) -> Result<f64, E>` is an [`Executor`], so simulators and backend
//! clients plug in without wrapper types. Backends that only return
//! measurement counts are adapted with [`ExpectationFromCounts`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, ZneError, ZneResult};

/// Synchronous circuit executor.
pub trait Executor<C> {
    /// Run `circuit` and return the measured expectation value.
    fn execute(&self, circuit: &C) -> ZneResult<f64>;
}

impl<C, F, E> Executor<C> for F
where
    F: Fn(&C) -> Result<f64, E>,
    E: Into<BoxError>,
{
    fn execute(&self, circuit: &C) -> ZneResult<f64> {
        self(circuit).map_err(ZneError::executor)
    }
}

/// Asynchronous circuit executor, for remote backends.
#[async_trait]
pub trait AsyncExecutor<C: Sync>: Send + Sync {
    /// Run `circuit` and return the measured expectation value.
    async fn execute(&self, circuit: &C) -> ZneResult<f64>;
}

/// Measurement outcome histogram keyed by bitstring.
///
/// The rightmost character of a key is qubit 0.
pub type Counts = BTreeMap<String, u64>;

/// Executor that returns measurement counts.
pub trait CountsExecutor<C> {
    /// Run `circuit` and return its outcome histogram.
    fn execute_counts(&self, circuit: &C) -> ZneResult<Counts>;
}

impl<C, F, E> CountsExecutor<C> for F
where
    F: Fn(&C) -> Result<Counts, E>,
    E: Into<BoxError>,
{
    fn execute_counts(&self, circuit: &C) -> ZneResult<Counts> {
        self(circuit).map_err(ZneError::executor)
    }
}

/// Product of Pauli Z operators on a set of qubits.
///
/// Its value on a bitstring is `+1` for even parity of the selected bits and
/// `-1` for odd parity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZObservable {
    qubits: Vec<usize>,
}

impl ZObservable {
    /// Z parity over `qubits`.
    pub fn new(qubits: impl IntoIterator<Item = usize>) -> Self {
        let mut qubits: Vec<usize> = qubits.into_iter().collect();
        qubits.sort_unstable();
        qubits.dedup();
        Self { qubits }
    }

    /// Single-qubit Z.
    pub fn z(qubit: usize) -> Self {
        Self::new([qubit])
    }

    /// Qubits the observable acts on.
    pub fn qubits(&self) -> &[usize] {
        &self.qubits
    }

    /// Eigenvalue on one outcome.
    pub fn eigenvalue(&self, bitstring: &str) -> ZneResult<f64> {
        let bits = bitstring.as_bytes();
        let mut parity = false;
        for &qubit in &self.qubits {
            if qubit >= bits.len() {
                return Err(ZneError::executor(format!(
                    "outcome '{bitstring}' has no bit for qubit {qubit}"
                )));
            }
            match bits[bits.len() - 1 - qubit] {
                b'0' => {}
                b'1' => parity = !parity,
                other => {
                    return Err(ZneError::executor(format!(
                        "invalid character '{}' in outcome '{bitstring}'",
                        other as char
                    )));
                }
            }
        }
        Ok(if parity { -1.0 } else { 1.0 })
    }

    /// Shot-weighted expectation value.
    pub fn expectation(&self, counts: &Counts) -> ZneResult<f64> {
        let mut total = 0u64;
        let mut sum = 0.0;
        for (bitstring, &count) in counts {
            sum += self.eigenvalue(bitstring)? * count as f64;
            total += count;
        }
        if total == 0 {
            return Err(ZneError::executor("counts contain no shots"));
        }
        Ok(sum / total as f64)
    }
}

/// Adapts a [`CountsExecutor`] into an [`Executor`] by evaluating a Z
/// observable on the returned counts.
#[derive(Debug, Clone)]
pub struct ExpectationFromCounts<X> {
    executor: X,
    observable: ZObservable,
}

impl<X> ExpectationFromCounts<X> {
    /// Wrap `executor`, measuring `observable`.
    pub fn new(executor: X, observable: ZObservable) -> Self {
        Self {
            executor,
            observable,
        }
    }

    /// The measured observable.
    pub fn observable(&self) -> &ZObservable {
        &self.observable
    }
}

impl<C, X> Executor<C> for ExpectationFromCounts<X>
where
    X: CountsExecutor<C>,
{
    fn execute(&self, circuit: &C) -> ZneResult<f64> {
        let counts = self.executor.execute_counts(circuit)?;
        self.observable.expectation(&counts)
    }
}
