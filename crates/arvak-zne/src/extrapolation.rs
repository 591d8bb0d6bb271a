//! Extrapolation models for the zero-noise limit.
//!
//! Every model fits a curve through `(scale factor, expectation value)`
//! pairs and reports its value at scale 0. Fits are deterministic: no model
//! uses randomized initial guesses.
//!
//! | Model | Curve | `params` | Min points |
//! |---|---|---|---|
//! | [`Extrapolation::Linear`] | `b + a·x` | `[b, a]` | 2 |
//! | [`Extrapolation::Polynomial`] | `c0 + c1·x + … + cd·x^d` | `[c0, …, cd]` | d + 1 |
//! | [`Extrapolation::Exponential`] | `a·exp(−c·x) + b` | `[a, c, b]` | 3 (2 with asymptote) |
//! | [`Extrapolation::Richardson`] | interpolating polynomial of degree n − 1 | `[c0, …, c(n−1)]` | 2 |

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ZneError, ZneResult};

/// A single measurement: expectation value observed at a noise scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Noise scale factor the circuit was executed at.
    pub scale_factor: f64,
    /// Expectation value returned by the executor.
    pub expectation_value: f64,
}

impl DataPoint {
    /// Create a data point.
    pub fn new(scale_factor: f64, expectation_value: f64) -> Self {
        Self {
            scale_factor,
            expectation_value,
        }
    }
}

impl From<(f64, f64)> for DataPoint {
    fn from((scale_factor, expectation_value): (f64, f64)) -> Self {
        Self::new(scale_factor, expectation_value)
    }
}

/// Outcome of fitting an extrapolation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Estimated expectation value at zero noise.
    pub zero_noise_value: f64,
    /// Fitted parameters, ordered as documented on [`Extrapolation`].
    pub params: Vec<f64>,
    /// Sum of squared residuals over the input points.
    pub residual: f64,
    /// Coefficient of determination (R²).
    pub r_squared: f64,
    /// Model that produced the fit.
    pub model: Extrapolation,
}

impl FitResult {
    /// Evaluate the fitted curve at a scale factor.
    pub fn evaluate(&self, scale_factor: f64) -> f64 {
        match self.model {
            Extrapolation::Exponential { .. } => {
                let (a, c, b) = (self.params[0], self.params[1], self.params[2]);
                a * (-c * scale_factor).exp() + b
            }
            _ => horner(&self.params, scale_factor),
        }
    }
}

/// Zero-noise extrapolation model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Extrapolation {
    /// Ordinary least-squares line.
    #[default]
    Linear,
    /// Least-squares polynomial of the given degree (at least 1).
    Polynomial { degree: i32 },
    /// `a·exp(−c·x) + b`; a known asymptote `b` turns the fit into a
    /// log-linear regression.
    Exponential {
        #[serde(default)]
        asymptote: Option<f64>,
    },
    /// Polynomial interpolation through every point.
    Richardson,
}

impl Extrapolation {
    /// Polynomial model, validated.
    pub fn polynomial(degree: i32) -> ZneResult<Self> {
        let model = Extrapolation::Polynomial { degree };
        model.validate()?;
        Ok(model)
    }

    /// Exponential model with a free asymptote.
    pub fn exponential() -> Self {
        Extrapolation::Exponential { asymptote: None }
    }

    /// Exponential model with a known asymptote, validated.
    pub fn exponential_with_asymptote(asymptote: f64) -> ZneResult<Self> {
        let model = Extrapolation::Exponential {
            asymptote: Some(asymptote),
        };
        model.validate()?;
        Ok(model)
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Extrapolation::Linear => "linear",
            Extrapolation::Polynomial { .. } => "polynomial",
            Extrapolation::Exponential { .. } => "exponential",
            Extrapolation::Richardson => "richardson",
        }
    }

    /// Check the model's own parameters.
    pub fn validate(&self) -> ZneResult<()> {
        match *self {
            Extrapolation::Polynomial { degree } if degree < 1 => {
                Err(ZneError::InvalidConfiguration(format!(
                    "polynomial degree must be at least 1, got {degree}"
                )))
            }
            Extrapolation::Exponential {
                asymptote: Some(asymptote),
            } if !asymptote.is_finite() => Err(ZneError::InvalidConfiguration(format!(
                "exponential asymptote must be finite, got {asymptote}"
            ))),
            _ => Ok(()),
        }
    }

    /// Minimum number of data points the model can fit.
    pub fn min_points(&self) -> usize {
        match self {
            Extrapolation::Linear => 2,
            Extrapolation::Polynomial { degree } => (*degree).max(0) as usize + 1,
            Extrapolation::Exponential { asymptote: Some(_) } => 2,
            Extrapolation::Exponential { asymptote: None } => 3,
            Extrapolation::Richardson => 2,
        }
    }

    /// Fit the model and return the zero-noise estimate with diagnostics.
    pub fn fit(&self, points: &[DataPoint]) -> ZneResult<FitResult> {
        self.validate()?;
        if points.len() < self.min_points() {
            return Err(ZneError::InsufficientData {
                required: self.min_points(),
                got: points.len(),
            });
        }
        if points
            .iter()
            .any(|p| !p.scale_factor.is_finite() || !p.expectation_value.is_finite())
        {
            return Err(ZneError::FitDidNotConverge(
                "data contains non-finite values".to_string(),
            ));
        }

        let xs: Vec<f64> = points.iter().map(|p| p.scale_factor).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.expectation_value).collect();

        let (zero_noise_value, params) = match *self {
            Extrapolation::Linear => {
                let coeffs = polyfit(&xs, &ys, 1)?;
                (coeffs[0], coeffs)
            }
            Extrapolation::Polynomial { degree } => {
                let coeffs = polyfit(&xs, &ys, degree as usize)?;
                (coeffs[0], coeffs)
            }
            Extrapolation::Richardson => {
                let coeffs = polyfit(&xs, &ys, xs.len() - 1)?;
                (lagrange_at_zero(&xs, &ys)?, coeffs)
            }
            Extrapolation::Exponential {
                asymptote: Some(asymptote),
            } => exp_fit_with_asymptote(&xs, &ys, asymptote)?,
            Extrapolation::Exponential { asymptote: None } => exp_fit(&xs, &ys)?,
        };

        if !zero_noise_value.is_finite() {
            return Err(ZneError::FitDidNotConverge(format!(
                "{} fit produced a non-finite estimate",
                self.name()
            )));
        }

        let mut result = FitResult {
            zero_noise_value,
            params,
            residual: 0.0,
            r_squared: 1.0,
            model: *self,
        };
        let (residual, r_squared) = goodness_of_fit(&xs, &ys, |x| result.evaluate(x));
        result.residual = residual;
        result.r_squared = r_squared;

        trace!(
            model = self.name(),
            points = points.len(),
            estimate = zero_noise_value,
            residual,
            "fit complete"
        );
        Ok(result)
    }

    /// Convenience wrapper returning only the zero-noise estimate.
    pub fn extrapolate(&self, points: &[DataPoint]) -> ZneResult<f64> {
        self.fit(points).map(|fit| fit.zero_noise_value)
    }
}

/// Sum of squared residuals and R².
///
/// R² is reported as 1.0 when the data has no variance.
fn goodness_of_fit(xs: &[f64], ys: &[f64], curve: impl Fn(f64) -> f64) -> (f64, f64) {
    let n = ys.len() as f64;
    let mean = ys.iter().sum::<f64>() / n;
    let ss_tot: f64 = ys.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (y - curve(x)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        1.0
    };
    (ss_res, r_squared)
}

fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Least-squares polynomial coefficients `[c0, …, cd]`.
///
/// With exactly `d + 1` points the Vandermonde system is solved directly;
/// otherwise through the normal equations.
fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> ZneResult<Vec<f64>> {
    let p = degree + 1;
    let rows: Vec<Vec<f64>> = xs
        .iter()
        .map(|&x| {
            let mut row = Vec::with_capacity(p);
            let mut power = 1.0;
            for _ in 0..p {
                row.push(power);
                power *= x;
            }
            row
        })
        .collect();

    let solution = if xs.len() == p {
        solve_linear_system(rows, ys.to_vec())
    } else {
        let mut ata = vec![vec![0.0; p]; p];
        let mut aty = vec![0.0; p];
        for (row, &y) in rows.iter().zip(ys) {
            for j in 0..p {
                aty[j] += row[j] * y;
                for k in 0..p {
                    ata[j][k] += row[j] * row[k];
                }
            }
        }
        solve_linear_system(ata, aty)
    };

    solution.ok_or_else(|| {
        ZneError::FitDidNotConverge(format!(
            "degree-{degree} least-squares system is singular; scale factors must be distinct"
        ))
    })
}

/// Gaussian elimination with partial pivoting. `None` if the matrix is
/// numerically singular.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |m, v| m.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() <= 1e-12 * scale {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for row in (col + 1)..n {
            let factor = a[row][col] / pivot;
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        let tail: f64 = ((col + 1)..n).map(|k| a[col][k] * x[k]).sum();
        x[col] = (b[col] - tail) / a[col][col];
    }
    Some(x)
}

/// Value at zero of the polynomial interpolating all points.
fn lagrange_at_zero(xs: &[f64], ys: &[f64]) -> ZneResult<f64> {
    let mut result = 0.0;
    for (i, (&xi, &yi)) in xs.iter().zip(ys).enumerate() {
        let mut weight = 1.0;
        for (j, &xj) in xs.iter().enumerate() {
            if j == i {
                continue;
            }
            let gap = xi - xj;
            if gap.abs() < 1e-12 {
                return Err(ZneError::FitDidNotConverge(format!(
                    "richardson extrapolation needs distinct scale factors, {xi} is repeated"
                )));
            }
            weight *= -xj / gap;
        }
        result += yi * weight;
    }
    Ok(result)
}

/// Ordinary least-squares line: returns `(intercept, slope)`.
fn line_fit(xs: &[f64], ys: &[f64]) -> ZneResult<(f64, f64)> {
    let coeffs = polyfit(xs, ys, 1)?;
    Ok((coeffs[0], coeffs[1]))
}

/// `y = a·exp(−c·x) + b` with `b` fixed: regress `ln|y − b|` on `x`.
fn exp_fit_with_asymptote(xs: &[f64], ys: &[f64], asymptote: f64) -> ZneResult<(f64, Vec<f64>)> {
    let shifted: Vec<f64> = ys.iter().map(|y| y - asymptote).collect();
    let sign = shifted[0].signum();
    if shifted
        .iter()
        .any(|z| z.abs() < 1e-12 || z.signum() != sign)
    {
        return Err(ZneError::FitDidNotConverge(format!(
            "values must lie strictly on one side of the asymptote {asymptote}"
        )));
    }

    let logs: Vec<f64> = shifted.iter().map(|z| z.abs().ln()).collect();
    let (intercept, slope) = line_fit(xs, &logs)?;
    let a = sign * intercept.exp();
    let c = -slope;
    Ok((a + asymptote, vec![a, c, asymptote]))
}

const DECAY_RATE_MIN: f64 = 1e-3;
const DECAY_RATE_MAX: f64 = 1e2;
const DECAY_GRID_POINTS: usize = 81;
const GOLDEN_MAX_ITERATIONS: usize = 200;

/// `y = a·exp(−c·x) + b` with all three parameters free.
///
/// Variable projection: for fixed `c` the model is linear in `(a, b)`, so
/// only the decay rate is searched. A log-spaced grid over
/// `[DECAY_RATE_MIN, DECAY_RATE_MAX]` brackets the minimum, golden-section
/// search refines it.
fn exp_fit(xs: &[f64], ys: &[f64]) -> ZneResult<(f64, Vec<f64>)> {
    let (lo, hi) = ys
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &y| {
            (lo.min(y), hi.max(y))
        });
    if hi - lo <= 1e-12 * hi.abs().max(lo.abs()).max(1.0) {
        return Err(ZneError::FitDidNotConverge(
            "exponential fit is degenerate for constant data".to_string(),
        ));
    }

    let cost = |log_c: f64| {
        project_linear(xs, ys, log_c.exp()).map_or(f64::INFINITY, |(_, _, ssr)| ssr)
    };

    let (log_min, log_max) = (DECAY_RATE_MIN.ln(), DECAY_RATE_MAX.ln());
    let step = (log_max - log_min) / (DECAY_GRID_POINTS - 1) as f64;
    let grid: Vec<f64> = (0..DECAY_GRID_POINTS)
        .map(|i| log_min + step * i as f64)
        .collect();
    let costs: Vec<f64> = grid.iter().map(|&u| cost(u)).collect();

    let best = costs
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_finite())
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .ok_or_else(|| {
            ZneError::FitDidNotConverge("no decay rate gives a solvable fit".to_string())
        })?;
    if best == 0 || best == DECAY_GRID_POINTS - 1 {
        return Err(ZneError::FitDidNotConverge(format!(
            "decay rate hit the search boundary [{DECAY_RATE_MIN}, {DECAY_RATE_MAX}]"
        )));
    }

    let log_c = golden_section(cost, grid[best - 1], grid[best + 1]);
    let c = log_c.exp();
    let (a, b, _) = project_linear(xs, ys, c).ok_or_else(|| {
        ZneError::FitDidNotConverge(format!("singular system at decay rate {c}"))
    })?;
    trace!(a, b, c, "exponential fit");
    Ok((a + b, vec![a, c, b]))
}

/// For a fixed decay rate solve for `(a, b)` and the sum of squared residuals.
fn project_linear(xs: &[f64], ys: &[f64], c: f64) -> Option<(f64, f64, f64)> {
    let n = xs.len() as f64;
    let e: Vec<f64> = xs.iter().map(|x| (-c * x).exp()).collect();
    let see: f64 = e.iter().map(|v| v * v).sum();
    let se: f64 = e.iter().sum();
    let sy: f64 = ys.iter().sum();
    let sey: f64 = e.iter().zip(ys).map(|(v, y)| v * y).sum();

    let det = see * n - se * se;
    if det.is_nan() || det <= 1e-12 * see * n {
        return None;
    }
    let a = (n * sey - se * sy) / det;
    let b = (see * sy - se * sey) / det;
    let ssr = e
        .iter()
        .zip(ys)
        .map(|(v, y)| (y - a * v - b).powi(2))
        .sum();
    Some((a, b, ssr))
}

/// Minimise a unimodal function on `[lo, hi]`.
fn golden_section(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);

    for _ in 0..GOLDEN_MAX_ITERATIONS {
        if (hi - lo).abs() < 1e-12 {
            break;
        }
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = f(x2);
        }
    }
    (lo + hi) / 2.0
}
