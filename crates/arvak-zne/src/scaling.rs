//! Noise scaling by unitary folding.
//!
//! Folding replaces a block of operations `G` with `G (G† G)^k`, which leaves
//! the ideal action of the circuit untouched while multiplying the number of
//! error-prone operations. Two granularities are provided:
//!
//! - **Global** folding repeats the whole unitary body: `C (C† C)^n L† L`,
//!   where `L` is a suffix of `C` covering the fractional remainder.
//! - **Local** folding folds individual gates: every gate is folded
//!   `floor(m / d)` times and `m mod d` gates receive one extra fold,
//!   selected by a [`FoldOrder`].
//!
//! With `d` foldable operations and scale factor `λ`, the folded circuit
//! holds approximately `λ·d` foldable operations, and exactly `λ·d` when `λ`
//! is an odd integer.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use arvak_ir::{Circuit, Instruction};

use crate::error::{ZneError, ZneResult};

/// Circuit capabilities required for folding.
///
/// Implemented for [`arvak_ir::Circuit`]; other circuit representations can
/// implement it to be scaled and mitigated.
pub trait Foldable: Sized {
    /// A single operation of the circuit.
    type Op: Clone;

    /// Number of qubits the circuit acts on.
    fn num_qubits(&self) -> usize;

    /// Operations in program order.
    fn operations(&self) -> &[Self::Op];

    /// The logical inverse of `op`, or `None` if it cannot be folded
    /// (measurement, reset, barrier).
    fn inverse(op: &Self::Op) -> Option<Self::Op>;

    /// A copy of this circuit (registers, metadata) with new operations.
    fn with_operations(&self, ops: Vec<Self::Op>) -> Self;

    /// Number of foldable operations.
    fn foldable_count(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| Self::inverse(op).is_some())
            .count()
    }
}

impl Foldable for Circuit {
    type Op = Instruction;

    fn num_qubits(&self) -> usize {
        Circuit::num_qubits(self)
    }

    fn operations(&self) -> &[Instruction] {
        self.instructions()
    }

    fn inverse(op: &Instruction) -> Option<Instruction> {
        op.inverse()
    }

    fn with_operations(&self, ops: Vec<Instruction>) -> Self {
        self.with_instructions(ops)
    }

    fn foldable_count(&self) -> usize {
        self.gate_count()
    }
}

/// Which gates receive the remainder fold in local folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldOrder {
    /// Earliest gates first.
    #[default]
    FromLeft,
    /// Latest gates first.
    FromRight,
    /// A uniform sample of distinct gates drawn from a seeded generator.
    AtRandom { seed: u64 },
}

/// Noise-scaling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum NoiseScaler {
    /// Fold the entire circuit, remainder folded on a suffix.
    Global,
    /// Fold individual gates.
    Local {
        #[serde(default, with = "serde_yaml::with::singleton_map")]
        order: FoldOrder,
    },
}

impl Default for NoiseScaler {
    fn default() -> Self {
        NoiseScaler::Local {
            order: FoldOrder::FromLeft,
        }
    }
}

impl NoiseScaler {
    /// Local folding with the given remainder order.
    pub fn local(order: FoldOrder) -> Self {
        NoiseScaler::Local { order }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            NoiseScaler::Global => "global",
            NoiseScaler::Local { .. } => "local",
        }
    }

    /// Produce a new circuit with noise scaled by `factor`.
    ///
    /// The input circuit is never modified. Factor 1 returns an identical
    /// operation list.
    pub fn scale<C: Foldable>(&self, circuit: &C, factor: f64) -> ZneResult<C> {
        let scaled = match self {
            NoiseScaler::Global => fold_global(circuit, factor)?,
            NoiseScaler::Local { order } => fold_gates(circuit, factor, *order)?,
        };
        trace!(
            scaler = self.name(),
            factor,
            ops_in = circuit.operations().len(),
            ops_out = scaled.operations().len(),
            "scaled circuit"
        );
        Ok(scaled)
    }

    /// The scale factor `scale` actually realises for this circuit: the ratio
    /// of foldable operations after and before folding.
    pub fn achieved_scale_factor<C: Foldable>(&self, circuit: &C, factor: f64) -> ZneResult<f64> {
        let scaled = self.scale(circuit, factor)?;
        Ok(folding_ratio(circuit, &scaled))
    }
}

/// Ratio of foldable operations in `scaled` to those in `original`; 1 for a
/// circuit with nothing to fold.
pub(crate) fn folding_ratio<C: Foldable>(original: &C, scaled: &C) -> f64 {
    match original.foldable_count() {
        0 => 1.0,
        count => scaled.foldable_count() as f64 / count as f64,
    }
}

/// Reject factors below 1, NaN and infinity.
pub fn check_scale_factor(factor: f64) -> ZneResult<()> {
    if factor.is_finite() && factor >= 1.0 {
        Ok(())
    } else {
        Err(ZneError::InvalidScaleFactor(factor))
    }
}

/// Global folding: `C (C† C)^n L† L`.
///
/// `n = floor((λ - 1) / 2)`; `L` is the final `k = round((λ - 2n - 1)·d / 2)`
/// unitary operations. Non-unitary operations must all come after the last
/// unitary one; they are re-appended after folding.
pub fn fold_global<C: Foldable>(circuit: &C, factor: f64) -> ZneResult<C> {
    check_scale_factor(factor)?;

    let ops = circuit.operations();
    let inverses: Vec<Option<C::Op>> = ops.iter().map(C::inverse).collect();
    let body_len = inverses
        .iter()
        .rposition(Option::is_some)
        .map_or(0, |last| last + 1);
    let (body, tail) = ops.split_at(body_len);
    let body_inverses = inverses[..body_len]
        .iter()
        .cloned()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            ZneError::InvalidConfiguration(
                "global folding requires non-unitary operations at the end of the circuit"
                    .to_string(),
            )
        })?;

    let d = body.len();
    if d == 0 {
        return Ok(circuit.with_operations(ops.to_vec()));
    }
    let full_folds = fold_count(((factor - 1.0) / 2.0).floor(), factor)?;
    let remainder = factor - (2.0 * full_folds as f64 + 1.0);
    let partial = ((remainder * d as f64 / 2.0).round() as usize).min(d);
    let len = full_folds
        .checked_mul(2)
        .and_then(|n| n.checked_add(1)?.checked_mul(d)?.checked_add(2 * partial + tail.len()));

    let mut folded = folded_buffer(len, factor)?;
    folded.extend_from_slice(body);
    for _ in 0..full_folds {
        folded.extend(body_inverses.iter().rev().cloned());
        folded.extend_from_slice(body);
    }
    if partial > 0 {
        let start = d - partial;
        folded.extend(body_inverses[start..].iter().rev().cloned());
        folded.extend_from_slice(&body[start..]);
    }
    folded.extend_from_slice(tail);

    Ok(circuit.with_operations(folded))
}

/// Local folding: `G -> G (G† G)^r` per gate.
///
/// `m = round((λ - 1)·d / 2)` folds are distributed evenly; the `m mod d`
/// leftover folds go to gates chosen by `order`. Non-unitary operations are
/// copied through unchanged.
pub fn fold_gates<C: Foldable>(circuit: &C, factor: f64, order: FoldOrder) -> ZneResult<C> {
    check_scale_factor(factor)?;

    let ops = circuit.operations();
    let inverses: Vec<Option<C::Op>> = ops.iter().map(C::inverse).collect();
    let d = inverses.iter().filter(|inv| inv.is_some()).count();
    if d == 0 {
        return Ok(circuit.with_operations(ops.to_vec()));
    }

    let total_folds = fold_count(((factor - 1.0) * d as f64 / 2.0).round(), factor)?;
    let len = total_folds
        .checked_mul(2)
        .and_then(|n| n.checked_add(ops.len()));
    let mut folded = folded_buffer(len, factor)?;
    let base = total_folds / d;
    let extra = total_folds % d;
    let mut folds = vec![base; d];
    for position in remainder_positions(d, extra, order) {
        folds[position] += 1;
    }

    let mut gate_index = 0;
    for (op, inverse) in ops.iter().zip(&inverses) {
        folded.push(op.clone());
        if let Some(inverse) = inverse {
            for _ in 0..folds[gate_index] {
                folded.push(inverse.clone());
                folded.push(op.clone());
            }
            gate_index += 1;
        }
    }

    Ok(circuit.with_operations(folded))
}

fn too_large(factor: f64) -> ZneError {
    ZneError::InvalidConfiguration(format!(
        "scale factor {factor} folds the circuit beyond a representable size"
    ))
}

/// A whole, non-negative number of folds as `usize`.
fn fold_count(count: f64, factor: f64) -> ZneResult<usize> {
    if count < usize::MAX as f64 {
        Ok(count as usize)
    } else {
        Err(too_large(factor))
    }
}

/// Empty buffer with room for a folded circuit of `len` operations.
fn folded_buffer<T>(len: Option<usize>, factor: f64) -> ZneResult<Vec<T>> {
    let len = len.ok_or_else(|| too_large(factor))?;
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| too_large(factor))?;
    Ok(buffer)
}

/// Indices (among the `d` foldable gates) that receive the extra fold.
fn remainder_positions(d: usize, extra: usize, order: FoldOrder) -> Vec<usize> {
    match order {
        FoldOrder::FromLeft => (0..extra).collect(),
        FoldOrder::FromRight => (d - extra..d).collect(),
        FoldOrder::AtRandom { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            rand::seq::index::sample(&mut rng, d, extra).into_vec()
        }
    }
}
