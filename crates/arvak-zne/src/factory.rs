//! Scale-factor sequencing and data collection.
//!
//! A [`Factory`] is a small state machine owned by one mitigation run:
//!
//! ```text
//! Configured --push_result--> Running --next_scale_factor() == None--> Complete --reduce--> Extrapolated
//! ```
//!
//! Static factories emit a fixed list of scale factors. Adaptive factories
//! pick each factor from the data seen so far and consult an injected
//! [`StoppingCriterion`] after every result; they fail with
//! [`ZneError::ConvergenceTimeout`] once `max_iterations` results are in
//! without convergence.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ZneError, ZneResult};
use crate::extrapolation::{DataPoint, Extrapolation, FitResult};
use crate::scaling::check_scale_factor;

/// Lifecycle of a [`Factory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryState {
    /// Policy set, no results yet.
    Configured,
    /// At least one result collected.
    Running,
    /// Sequence exhausted; ready to reduce.
    Complete,
    /// Zero-noise estimate computed and cached.
    Extrapolated,
}

impl fmt::Display for FactoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryState::Configured => write!(f, "configured"),
            FactoryState::Running => write!(f, "running"),
            FactoryState::Complete => write!(f, "complete"),
            FactoryState::Extrapolated => write!(f, "extrapolated"),
        }
    }
}

/// Decides when an adaptive factory has collected enough data.
///
/// `estimates` holds one zero-noise estimate per fit, in order; `points`
/// holds every result collected so far. Closures with the matching
/// signature implement this trait.
pub trait StoppingCriterion: Send + Sync {
    fn is_converged(&self, estimates: &[f64], points: &[DataPoint]) -> bool;
}

impl<F> StoppingCriterion for F
where
    F: Fn(&[f64], &[DataPoint]) -> bool + Send + Sync,
{
    fn is_converged(&self, estimates: &[f64], points: &[DataPoint]) -> bool {
        self(estimates, points)
    }
}

/// Converged when the last two successive estimates differ by less than
/// `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateStabilized {
    pub tolerance: f64,
}

impl StoppingCriterion for EstimateStabilized {
    fn is_converged(&self, estimates: &[f64], _points: &[DataPoint]) -> bool {
        match estimates {
            [.., previous, last] => (last - previous).abs() < self.tolerance,
            _ => false,
        }
    }
}

/// Parameters of the adaptive exponential policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Second scale factor; the first is always 1.
    pub initial_scale_factor: f64,
    /// Upper clamp for proposed scale factors.
    pub max_scale_factor: f64,
    /// Maximum number of executions before giving up.
    pub max_iterations: usize,
    /// Tolerance of the default [`EstimateStabilized`] criterion.
    pub tolerance: f64,
    /// Known asymptote of the exponential decay, if any.
    pub asymptote: Option<f64>,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            initial_scale_factor: 2.0,
            max_scale_factor: 6.0,
            max_iterations: 10,
            tolerance: 1e-3,
            asymptote: None,
        }
    }
}

impl AdaptiveConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the second scale factor.
    pub fn with_initial_scale_factor(mut self, factor: f64) -> Self {
        self.initial_scale_factor = factor;
        self
    }

    /// Set the upper clamp for scale factors.
    pub fn with_max_scale_factor(mut self, factor: f64) -> Self {
        self.max_scale_factor = factor;
        self
    }

    /// Set the iteration bound.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Fix the exponential asymptote.
    pub fn with_asymptote(mut self, asymptote: f64) -> Self {
        self.asymptote = Some(asymptote);
        self
    }

    /// The model adaptive factories fit and reduce with.
    pub fn extrapolation(&self) -> Extrapolation {
        Extrapolation::Exponential {
            asymptote: self.asymptote,
        }
    }

    /// Fail fast on parameters that cannot terminate sensibly.
    pub fn validate(&self) -> ZneResult<()> {
        let invalid = |msg: String| Err(ZneError::InvalidConfiguration(msg));
        self.extrapolation().validate()?;
        if !(self.initial_scale_factor.is_finite() && self.initial_scale_factor > 1.0) {
            return invalid(format!(
                "adaptive initial scale factor must be > 1, got {}",
                self.initial_scale_factor
            ));
        }
        if !(self.max_scale_factor.is_finite()
            && self.max_scale_factor >= self.initial_scale_factor)
        {
            return invalid(format!(
                "adaptive max scale factor {} is below the initial scale factor {}",
                self.max_scale_factor, self.initial_scale_factor
            ));
        }
        let required = self.extrapolation().min_points() + 1;
        if self.max_iterations < required {
            return invalid(format!(
                "adaptive max_iterations must be at least {required}, got {}",
                self.max_iterations
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid(format!(
                "adaptive tolerance must be positive, got {}",
                self.tolerance
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
enum Policy {
    Static(Vec<f64>),
    Adaptive(AdaptiveState),
}

#[derive(Clone)]
struct AdaptiveState {
    config: AdaptiveConfig,
    criterion: Arc<dyn StoppingCriterion>,
    estimates: Vec<f64>,
    last_fit: Option<FitResult>,
    converged: bool,
}

impl AdaptiveState {
    fn clear(&mut self) {
        self.estimates.clear();
        self.last_fit = None;
        self.converged = false;
    }

    /// Next factor: bootstrap with `1, s, 2s - 1, …` until the model can be
    /// fitted, then `1 + 1/c` from the fitted decay rate.
    fn propose(&self, collected: usize) -> f64 {
        let max = self.config.max_scale_factor;
        let step = self.config.initial_scale_factor - 1.0;
        let proposal = match &self.last_fit {
            None => 1.0 + collected as f64 * step,
            Some(fit) => {
                let rate = fit.params[1].abs();
                if rate > 0.0 { 1.0 + 1.0 / rate } else { max }
            }
        };
        if proposal > max {
            warn!(proposal, max, "adaptive scale factor clamped");
            max
        } else {
            proposal.max(1.0)
        }
    }
}

/// Drives the scale-factor sequence of one mitigation run and holds the
/// collected data.
#[derive(Clone)]
pub struct Factory {
    policy: Policy,
    extrapolation: Extrapolation,
    points: Vec<DataPoint>,
    state: FactoryState,
    result: Option<FitResult>,
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Factory");
        match &self.policy {
            Policy::Static(factors) => s.field("scale_factors", factors),
            Policy::Adaptive(adaptive) => s.field("adaptive", &adaptive.config),
        };
        s.field("extrapolation", &self.extrapolation)
            .field("points", &self.points)
            .field("state", &self.state)
            .finish()
    }
}

impl Factory {
    /// Static factory over a fixed scale-factor sequence.
    pub fn new_static(scale_factors: Vec<f64>, extrapolation: Extrapolation) -> ZneResult<Self> {
        extrapolation.validate()?;
        if scale_factors.is_empty() {
            return Err(ZneError::InvalidConfiguration(
                "scale factor sequence is empty".to_string(),
            ));
        }
        for &factor in &scale_factors {
            check_scale_factor(factor).map_err(|_| {
                ZneError::InvalidConfiguration(format!(
                    "scale factor {factor} is invalid: factors must be finite and >= 1"
                ))
            })?;
        }
        if scale_factors.len() < extrapolation.min_points() {
            return Err(ZneError::InvalidConfiguration(format!(
                "{} extrapolation needs at least {} scale factors, got {}",
                extrapolation.name(),
                extrapolation.min_points(),
                scale_factors.len()
            )));
        }
        let mut distinct = scale_factors.clone();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        let required = match extrapolation {
            Extrapolation::Richardson => scale_factors.len(),
            _ => extrapolation.min_points(),
        };
        if distinct.len() < required {
            return Err(ZneError::InvalidConfiguration(format!(
                "{} extrapolation needs {required} distinct scale factors, got {}",
                extrapolation.name(),
                distinct.len()
            )));
        }
        Ok(Self::with_policy(Policy::Static(scale_factors), extrapolation))
    }

    /// Static factory with linear extrapolation.
    pub fn linear(scale_factors: Vec<f64>) -> ZneResult<Self> {
        Self::new_static(scale_factors, Extrapolation::Linear)
    }

    /// Static factory with polynomial extrapolation.
    pub fn polynomial(scale_factors: Vec<f64>, degree: i32) -> ZneResult<Self> {
        Self::new_static(scale_factors, Extrapolation::Polynomial { degree })
    }

    /// Static factory with Richardson extrapolation.
    pub fn richardson(scale_factors: Vec<f64>) -> ZneResult<Self> {
        Self::new_static(scale_factors, Extrapolation::Richardson)
    }

    /// Static factory with exponential extrapolation.
    pub fn exponential(scale_factors: Vec<f64>, asymptote: Option<f64>) -> ZneResult<Self> {
        Self::new_static(scale_factors, Extrapolation::Exponential { asymptote })
    }

    /// Adaptive exponential factory with the [`EstimateStabilized`]
    /// criterion.
    pub fn adaptive(config: AdaptiveConfig) -> ZneResult<Self> {
        config.validate()?;
        let extrapolation = config.extrapolation();
        let criterion = Arc::new(EstimateStabilized {
            tolerance: config.tolerance,
        });
        let state = AdaptiveState {
            config,
            criterion,
            estimates: Vec::new(),
            last_fit: None,
            converged: false,
        };
        Ok(Self::with_policy(Policy::Adaptive(state), extrapolation))
    }

    /// Replace the stopping criterion of an adaptive factory. No effect on
    /// static factories.
    pub fn with_stopping_criterion(mut self, criterion: impl StoppingCriterion + 'static) -> Self {
        if let Policy::Adaptive(adaptive) = &mut self.policy {
            adaptive.criterion = Arc::new(criterion);
        }
        self
    }

    fn with_policy(policy: Policy, extrapolation: Extrapolation) -> Self {
        Self {
            policy,
            extrapolation,
            points: Vec::new(),
            state: FactoryState::Configured,
            result: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FactoryState {
        self.state
    }

    /// Whether the scale sequence is fixed in advance.
    pub fn is_static(&self) -> bool {
        matches!(self.policy, Policy::Static(_))
    }

    /// The fixed sequence of a static factory.
    pub fn static_scale_factors(&self) -> Option<&[f64]> {
        match &self.policy {
            Policy::Static(factors) => Some(factors),
            Policy::Adaptive(_) => None,
        }
    }

    /// Model used by [`Factory::reduce`].
    pub fn extrapolation(&self) -> Extrapolation {
        self.extrapolation
    }

    /// Collected data in push order.
    pub fn data_points(&self) -> &[DataPoint] {
        &self.points
    }

    /// Scale factors of the collected data.
    pub fn scale_factors(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.scale_factor).collect()
    }

    /// Expectation values of the collected data.
    pub fn expectation_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.expectation_value).collect()
    }

    /// Zero-noise estimates produced so far by an adaptive factory.
    pub fn intermediate_estimates(&self) -> &[f64] {
        match &self.policy {
            Policy::Adaptive(adaptive) => &adaptive.estimates,
            Policy::Static(_) => &[],
        }
    }

    /// Next scale factor to execute, or `None` once the policy is exhausted.
    ///
    /// Returning `None` moves the factory to [`FactoryState::Complete`].
    /// A static factory keeps returning the same factor until its result is
    /// pushed.
    pub fn next_scale_factor(&mut self) -> ZneResult<Option<f64>> {
        match self.state {
            FactoryState::Complete => return Ok(None),
            FactoryState::Extrapolated => {
                return Err(self.invalid_state("request a scale factor"));
            }
            FactoryState::Configured | FactoryState::Running => {}
        }

        let collected = self.points.len();
        let next = match &self.policy {
            Policy::Static(factors) => factors.get(collected).copied(),
            Policy::Adaptive(adaptive) => {
                if adaptive.converged {
                    None
                } else if collected >= adaptive.config.max_iterations {
                    return Err(ZneError::ConvergenceTimeout {
                        max_iterations: adaptive.config.max_iterations,
                    });
                } else {
                    Some(adaptive.propose(collected))
                }
            }
        };

        if next.is_none() {
            self.state = FactoryState::Complete;
        }
        Ok(next)
    }

    /// Record the result of executing at `scale_factor`.
    ///
    /// Adaptive factories fit their model after each result once enough data
    /// is in, and consult the stopping criterion; a failing fit is returned
    /// here with the point kept.
    pub fn push_result(&mut self, scale_factor: f64, expectation_value: f64) -> ZneResult<()> {
        if matches!(
            self.state,
            FactoryState::Complete | FactoryState::Extrapolated
        ) {
            return Err(self.invalid_state("push a result"));
        }
        check_scale_factor(scale_factor)?;
        if let Policy::Static(factors) = &self.policy {
            match factors.get(self.points.len()) {
                None => return Err(self.invalid_state("push a result past the sequence end")),
                Some(&pending) if pending != scale_factor => {
                    return Err(self.invalid_state("push a result for a non-pending factor"));
                }
                Some(_) => {}
            }
        }

        self.points
            .push(DataPoint::new(scale_factor, expectation_value));
        self.state = FactoryState::Running;
        debug!(
            scale_factor,
            expectation_value,
            collected = self.points.len(),
            "result pushed"
        );

        let extrapolation = self.extrapolation;
        if let Policy::Adaptive(adaptive) = &mut self.policy {
            if self.points.len() >= extrapolation.min_points() {
                let fit = extrapolation.fit(&self.points)?;
                adaptive.estimates.push(fit.zero_noise_value);
                adaptive.last_fit = Some(fit);
                adaptive.converged = adaptive
                    .criterion
                    .is_converged(&adaptive.estimates, &self.points);
                debug!(
                    estimate = adaptive.estimates.last().copied(),
                    converged = adaptive.converged,
                    "adaptive step"
                );
            }
        }
        Ok(())
    }

    /// Fit the extrapolation model and return the zero-noise estimate.
    ///
    /// Valid only once the factory is complete. The result is cached:
    /// further calls return it without refitting. A failed fit leaves the
    /// factory complete.
    pub fn reduce(&mut self) -> ZneResult<FitResult> {
        match self.state {
            FactoryState::Extrapolated => {
                if let Some(result) = &self.result {
                    return Ok(result.clone());
                }
            }
            FactoryState::Complete => {}
            FactoryState::Configured | FactoryState::Running => {
                return Err(self.invalid_state("reduce"));
            }
        }

        let cached = match &self.policy {
            Policy::Adaptive(adaptive) => adaptive.last_fit.clone(),
            Policy::Static(_) => None,
        };
        let fit = match cached {
            Some(fit) => fit,
            None => self.extrapolation.fit(&self.points)?,
        };
        self.result = Some(fit.clone());
        self.state = FactoryState::Extrapolated;
        Ok(fit)
    }

    /// The cached result, if [`Factory::reduce`] has succeeded.
    pub fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }

    /// Drop all data and return to [`FactoryState::Configured`].
    pub fn reset(&mut self) {
        self.points.clear();
        self.result = None;
        self.state = FactoryState::Configured;
        if let Policy::Adaptive(adaptive) = &mut self.policy {
            adaptive.clear();
        }
    }

    fn invalid_state(&self, operation: &'static str) -> ZneError {
        ZneError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn decay(x: f64) -> f64 {
        0.4 * (-0.7 * x).exp() + 0.5
    }

    fn drive(factory: &mut Factory, f: impl Fn(f64) -> f64) -> ZneResult<FitResult> {
        while let Some(scale) = factory.next_scale_factor()? {
            factory.push_result(scale, f(scale))?;
        }
        factory.reduce()
    }

    #[test]
    fn test_static_lifecycle() {
        let mut factory = Factory::linear(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(factory.state(), FactoryState::Configured);

        assert_eq!(factory.next_scale_factor().unwrap(), Some(1.0));
        // Pending factor repeats until its result arrives.
        assert_eq!(factory.next_scale_factor().unwrap(), Some(1.0));
        factory.push_result(1.0, 5.0).unwrap();
        assert_eq!(factory.state(), FactoryState::Running);

        assert_eq!(factory.next_scale_factor().unwrap(), Some(2.0));
        factory.push_result(2.0, 7.0).unwrap();
        assert_eq!(factory.next_scale_factor().unwrap(), Some(3.0));
        factory.push_result(3.0, 9.0).unwrap();
        assert_eq!(factory.state(), FactoryState::Running);

        assert_eq!(factory.next_scale_factor().unwrap(), None);
        assert_eq!(factory.state(), FactoryState::Complete);
        assert_eq!(factory.next_scale_factor().unwrap(), None);

        let fit = factory.reduce().unwrap();
        assert_abs_diff_eq!(fit.zero_noise_value, 3.0, epsilon = 1e-10);
        assert_eq!(factory.state(), FactoryState::Extrapolated);
        assert_eq!(factory.scale_factors(), vec![1.0, 2.0, 3.0]);
        assert_eq!(factory.expectation_values(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let mut factory = Factory::richardson(vec![1.0, 2.0, 3.0]).unwrap();
        let first = drive(&mut factory, |x| 1.0 - 0.1 * x).unwrap();
        let second = factory.reduce().unwrap();
        assert_eq!(first, second);
        assert_eq!(factory.result(), Some(&first));
    }

    #[test]
    fn test_reduce_before_complete() {
        let mut factory = Factory::linear(vec![1.0, 3.0]).unwrap();
        assert!(matches!(
            factory.reduce(),
            Err(ZneError::InvalidState { operation: "reduce", .. })
        ));
        factory.push_result(1.0, 0.5).unwrap();
        factory.push_result(3.0, 0.3).unwrap();
        // Still running until the sequence is observed to be exhausted.
        assert!(factory.reduce().is_err());
        assert_eq!(factory.next_scale_factor().unwrap(), None);
        assert!(factory.reduce().is_ok());
    }

    #[test]
    fn test_push_after_complete() {
        let mut factory = Factory::linear(vec![1.0, 2.0]).unwrap();
        drive(&mut factory, |x| x).unwrap();
        assert!(matches!(
            factory.push_result(1.0, 0.0),
            Err(ZneError::InvalidState { .. })
        ));
        assert!(matches!(
            factory.next_scale_factor(),
            Err(ZneError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_push_past_sequence_end() {
        let mut factory = Factory::linear(vec![1.0, 2.0]).unwrap();
        factory.push_result(1.0, 0.9).unwrap();
        factory.push_result(2.0, 0.8).unwrap();
        assert!(matches!(
            factory.push_result(3.0, 0.7),
            Err(ZneError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_push_must_match_pending_factor() {
        let mut factory = Factory::linear(vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            factory.push_result(7.0, 0.1),
            Err(ZneError::InvalidState { .. })
        ));
        assert!(factory.data_points().is_empty());
        assert_eq!(factory.state(), FactoryState::Configured);

        factory.push_result(1.0, 0.9).unwrap();
        assert!(matches!(
            factory.push_result(1.0, 0.9),
            Err(ZneError::InvalidState { .. })
        ));
        factory.push_result(2.0, 0.8).unwrap();
        assert_eq!(factory.scale_factors(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_push_invalid_scale() {
        let mut factory = Factory::linear(vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            factory.push_result(0.5, 1.0),
            Err(ZneError::InvalidScaleFactor(_))
        ));
        assert_eq!(factory.state(), FactoryState::Configured);
    }

    #[test]
    fn test_static_validation() {
        assert!(matches!(
            Factory::linear(vec![]),
            Err(ZneError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Factory::linear(vec![1.0, 0.5]),
            Err(ZneError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Factory::linear(vec![1.0, f64::NAN]),
            Err(ZneError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Factory::polynomial(vec![1.0, 2.0], 2),
            Err(ZneError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Factory::polynomial(vec![1.0, 2.0, 3.0], 0),
            Err(ZneError::InvalidConfiguration(_))
        ));
        assert!(Factory::exponential(vec![1.0, 2.0, 3.0], None).is_ok());
    }

    #[test]
    fn test_duplicate_factors_rejected() {
        assert!(matches!(
            Factory::richardson(vec![1.0, 3.0, 3.0]),
            Err(ZneError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Factory::linear(vec![2.0, 2.0, 2.0]),
            Err(ZneError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Factory::polynomial(vec![1.0, 2.0, 2.0], 2),
            Err(ZneError::InvalidConfiguration(_))
        ));
        // Repeated factors are fine while the model still has enough
        // distinct ones.
        assert!(Factory::linear(vec![1.0, 1.0, 3.0]).is_ok());
    }

    #[test]
    fn test_failed_fit_keeps_factory_complete() {
        let mut factory = Factory::exponential(vec![1.0, 2.0, 3.0], None).unwrap();
        let err = drive(&mut factory, |_| 0.25).unwrap_err();
        assert!(matches!(err, ZneError::FitDidNotConverge(_)));
        assert_eq!(factory.state(), FactoryState::Complete);
    }

    #[test]
    fn test_reset() {
        let mut factory = Factory::linear(vec![1.0, 2.0]).unwrap();
        drive(&mut factory, |x| 2.0 * x).unwrap();
        factory.reset();
        assert_eq!(factory.state(), FactoryState::Configured);
        assert!(factory.data_points().is_empty());
        assert!(factory.result().is_none());
        assert_eq!(factory.next_scale_factor().unwrap(), Some(1.0));
    }

    #[test]
    fn test_estimate_stabilized() {
        let criterion = EstimateStabilized { tolerance: 0.01 };
        assert!(!criterion.is_converged(&[], &[]));
        assert!(!criterion.is_converged(&[0.5], &[]));
        assert!(!criterion.is_converged(&[0.5, 0.6], &[]));
        assert!(criterion.is_converged(&[0.5, 0.6, 0.605], &[]));
    }

    #[test]
    fn test_adaptive_converges_on_exact_decay() {
        let mut factory = Factory::adaptive(AdaptiveConfig::new()).unwrap();
        assert!(!factory.is_static());

        let fit = drive(&mut factory, decay).unwrap();
        assert_abs_diff_eq!(fit.zero_noise_value, 0.9, epsilon = 1e-5);
        assert_eq!(factory.data_points().len(), 4);

        let scales = factory.scale_factors();
        assert_eq!(&scales[..3], &[1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(scales[3], 1.0 + 1.0 / 0.7, epsilon = 1e-3);
        assert_eq!(factory.intermediate_estimates().len(), 2);
    }

    #[test]
    fn test_adaptive_with_asymptote_needs_fewer_points() {
        let config = AdaptiveConfig::new().with_asymptote(0.5);
        let mut factory = Factory::adaptive(config).unwrap();
        let fit = drive(&mut factory, decay).unwrap();
        assert_abs_diff_eq!(fit.zero_noise_value, 0.9, epsilon = 1e-9);
        assert_eq!(factory.data_points().len(), 3);
    }

    #[test]
    fn test_adaptive_timeout() {
        let config = AdaptiveConfig::new().with_max_iterations(5);
        let mut factory = Factory::adaptive(config)
            .unwrap()
            .with_stopping_criterion(|_: &[f64], _: &[DataPoint]| false);

        let err = drive(&mut factory, decay).unwrap_err();
        assert!(matches!(
            err,
            ZneError::ConvergenceTimeout { max_iterations: 5 }
        ));
        assert_eq!(factory.data_points().len(), 5);
    }

    #[test]
    fn test_adaptive_custom_criterion_sees_points() {
        let config = AdaptiveConfig::new().with_asymptote(0.5);
        let mut factory = Factory::adaptive(config)
            .unwrap()
            .with_stopping_criterion(|_: &[f64], points: &[DataPoint]| points.len() >= 6);
        drive(&mut factory, decay).unwrap();
        assert_eq!(factory.data_points().len(), 6);
    }

    #[test]
    fn test_adaptive_clamps_to_max() {
        // Slow decay proposes 1 + 1/0.05 = 21, clamped to 4.
        let config = AdaptiveConfig::new()
            .with_asymptote(0.0)
            .with_max_scale_factor(4.0);
        let mut factory = Factory::adaptive(config).unwrap();
        drive(&mut factory, |x| (-0.05 * x).exp()).unwrap();
        assert!(factory.scale_factors().iter().all(|&s| s <= 4.0));
        assert!(factory.scale_factors().contains(&4.0));
    }

    #[test]
    fn test_adaptive_validation() {
        let bad = [
            AdaptiveConfig::new().with_initial_scale_factor(1.0),
            AdaptiveConfig::new().with_max_scale_factor(1.5),
            AdaptiveConfig::new().with_max_iterations(3),
            AdaptiveConfig::new().with_tolerance(0.0),
            AdaptiveConfig::new().with_asymptote(f64::INFINITY),
        ];
        for config in bad {
            assert!(matches!(
                Factory::adaptive(config),
                Err(ZneError::InvalidConfiguration(_))
            ));
        }
        assert!(Factory::adaptive(AdaptiveConfig::new().with_asymptote(0.0).with_max_iterations(3)).is_ok());
    }
}
