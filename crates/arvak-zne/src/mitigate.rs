//! Mitigated execution.
//!
//! The orchestrator drives one [`Factory`] per call: it asks for a scale
//! factor, folds the circuit, runs it, pushes the result and repeats until
//! the factory is complete, then extrapolates. Executor and fitting errors
//! are returned as-is; there is no fallback to the unmitigated value.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use crate::config::ZneConfig;
use crate::error::ZneResult;
use crate::executor::{AsyncExecutor, Executor};
use crate::extrapolation::{DataPoint, FitResult};
use crate::factory::{Factory, FactoryState};
use crate::scaling::{Foldable, NoiseScaler, folding_ratio};

/// Full result of a mitigated execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ZneOutcome {
    /// Extrapolated zero-noise estimate.
    pub zero_noise_value: f64,
    /// Fitted model.
    pub fit: FitResult,
    /// Data collected, in execution order.
    pub data_points: Vec<DataPoint>,
}

impl ZneOutcome {
    fn from_factory(factory: &Factory, fit: FitResult) -> Self {
        Self {
            zero_noise_value: fit.zero_noise_value,
            fit,
            data_points: factory.data_points().to_vec(),
        }
    }

    /// Value measured at scale factor 1, if that point was sampled.
    pub fn unmitigated_value(&self) -> Option<f64> {
        self.data_points
            .iter()
            .find(|p| p.scale_factor == 1.0)
            .map(|p| p.expectation_value)
    }
}

/// Drive `factory` to completion and extrapolate.
///
/// The factory is used as-is, so callers can inspect it afterwards. An
/// already extrapolated factory returns its cached result without running
/// anything.
pub fn run_factory<C, E>(
    circuit: &C,
    executor: &E,
    factory: &mut Factory,
    scaler: &NoiseScaler,
) -> ZneResult<FitResult>
where
    C: Foldable,
    E: Executor<C> + ?Sized,
{
    if factory.state() == FactoryState::Extrapolated {
        return factory.reduce();
    }

    while let Some(scale_factor) = factory.next_scale_factor()? {
        let scaled = scaler.scale(circuit, scale_factor)?;
        let value = executor.execute(&scaled)?;
        log_execution(circuit, &scaled, scale_factor, value);
        factory.push_result(scale_factor, value)?;
    }

    let fit = factory.reduce()?;
    info!(
        zero_noise_value = fit.zero_noise_value,
        model = fit.model.name(),
        points = factory.data_points().len(),
        "zero-noise estimate"
    );
    Ok(fit)
}

/// Run `circuit` under zero-noise extrapolation and return the estimate.
///
/// `factory` is reset before use.
pub fn execute_with_zne<C, E>(
    circuit: &C,
    executor: &E,
    factory: Factory,
    scaler: &NoiseScaler,
) -> ZneResult<f64>
where
    C: Foldable,
    E: Executor<C> + ?Sized,
{
    execute_with_zne_detailed(circuit, executor, factory, scaler).map(|o| o.zero_noise_value)
}

/// Like [`execute_with_zne`], returning the fit and the collected data.
#[instrument(level = "debug", skip_all, fields(scaler = scaler.name()))]
pub fn execute_with_zne_detailed<C, E>(
    circuit: &C,
    executor: &E,
    mut factory: Factory,
    scaler: &NoiseScaler,
) -> ZneResult<ZneOutcome>
where
    C: Foldable,
    E: Executor<C> + ?Sized,
{
    factory.reset();
    let fit = run_factory(circuit, executor, &mut factory, scaler)?;
    Ok(ZneOutcome::from_factory(&factory, fit))
}

/// Asynchronous mitigated execution.
///
/// All circuits of a static sequence are folded up front and submitted
/// concurrently; results are pushed in sequence order. Adaptive factories
/// need each result before choosing the next factor and run sequentially.
pub async fn execute_with_zne_async<C, E>(
    circuit: &C,
    executor: &E,
    mut factory: Factory,
    scaler: &NoiseScaler,
) -> ZneResult<ZneOutcome>
where
    C: Foldable + Send + Sync,
    E: AsyncExecutor<C> + ?Sized,
{
    factory.reset();

    if let Some(scale_factors) = factory.static_scale_factors().map(<[f64]>::to_vec) {
        let circuits = scale_factors
            .iter()
            .map(|&s| scaler.scale(circuit, s))
            .collect::<ZneResult<Vec<_>>>()?;
        debug!(circuits = circuits.len(), "submitting folded circuits");
        let values = try_join_all(circuits.iter().map(|c| executor.execute(c))).await?;
        let executed = scale_factors.into_iter().zip(&circuits).zip(values);
        for ((scale_factor, scaled), value) in executed {
            log_execution(circuit, scaled, scale_factor, value);
            factory.push_result(scale_factor, value)?;
        }
        let leftover = factory.next_scale_factor()?;
        debug_assert!(leftover.is_none());
    } else {
        while let Some(scale_factor) = factory.next_scale_factor()? {
            let scaled = scaler.scale(circuit, scale_factor)?;
            let value = executor.execute(&scaled).await?;
            log_execution(circuit, &scaled, scale_factor, value);
            factory.push_result(scale_factor, value)?;
        }
    }

    let fit = factory.reduce()?;
    info!(
        zero_noise_value = fit.zero_noise_value,
        model = fit.model.name(),
        points = factory.data_points().len(),
        "zero-noise estimate"
    );
    Ok(ZneOutcome::from_factory(&factory, fit))
}

fn log_execution<C: Foldable>(circuit: &C, scaled: &C, requested: f64, value: f64) {
    let achieved = folding_ratio(circuit, scaled);
    debug!(requested, achieved, value, "executed scaled circuit");
}

/// An executor whose results are zero-noise estimates.
///
/// Wraps an inner executor together with a factory template and a scaler.
/// Every call starts from a fresh copy of the template, so a mitigated
/// executor can be reused and shared.
#[derive(Debug, Clone)]
pub struct MitigatedExecutor<E> {
    executor: E,
    factory: Factory,
    scaler: NoiseScaler,
}

impl<E> MitigatedExecutor<E> {
    /// Build from a configuration, validating it first.
    pub fn new(executor: E, config: &ZneConfig) -> ZneResult<Self> {
        let factory = config.build_factory()?;
        Ok(Self::from_factory(executor, factory, config.scaler))
    }

    /// Build from an explicit factory template.
    pub fn from_factory(executor: E, factory: Factory, scaler: NoiseScaler) -> Self {
        Self {
            executor,
            factory,
            scaler,
        }
    }

    /// The wrapped executor.
    pub fn inner(&self) -> &E {
        &self.executor
    }

    /// The factory template.
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// The noise scaler.
    pub fn scaler(&self) -> &NoiseScaler {
        &self.scaler
    }

    /// Run `circuit` and return the full outcome.
    pub fn execute_detailed<C>(&self, circuit: &C) -> ZneResult<ZneOutcome>
    where
        C: Foldable,
        E: Executor<C>,
    {
        execute_with_zne_detailed(circuit, &self.executor, self.factory.clone(), &self.scaler)
    }
}

impl<C, E> Executor<C> for MitigatedExecutor<E>
where
    C: Foldable,
    E: Executor<C>,
{
    fn execute(&self, circuit: &C) -> ZneResult<f64> {
        self.execute_detailed(circuit).map(|o| o.zero_noise_value)
    }
}

#[async_trait]
impl<C, E> AsyncExecutor<C> for MitigatedExecutor<E>
where
    C: Foldable + Send + Sync,
    E: AsyncExecutor<C>,
{
    async fn execute(&self, circuit: &C) -> ZneResult<f64> {
        let outcome =
            execute_with_zne_async(circuit, &self.executor, self.factory.clone(), &self.scaler)
                .await?;
        Ok(outcome.zero_noise_value)
    }
}

/// Wrap `executor` so that each call returns a zero-noise estimate.
pub fn mitigate_executor<E>(executor: E, config: &ZneConfig) -> ZneResult<MitigatedExecutor<E>> {
    MitigatedExecutor::new(executor, config)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use approx::assert_abs_diff_eq;
    use arvak_ir::{Circuit, ClbitId, QubitId};

    use super::*;
    use crate::error::ZneError;
    use crate::extrapolation::Extrapolation;
    use crate::factory::AdaptiveConfig;

    fn circuit() -> Circuit {
        let q = QubitId(0);
        let mut circuit = Circuit::new("test", 1);
        circuit.h(q).unwrap().rz(0.3, q).unwrap().h(q).unwrap();
        circuit
    }

    /// Value decays linearly with circuit length: 1 - 0.01 * ops.
    fn length_executor(calls: &Cell<usize>) -> impl Fn(&Circuit) -> Result<f64, String> + '_ {
        move |c: &Circuit| {
            calls.set(calls.get() + 1);
            Ok(1.0 - 0.01 * c.num_ops() as f64)
        }
    }

    #[test]
    fn test_static_run_calls_executor_once_per_factor() {
        let calls = Cell::new(0);
        let exec = length_executor(&calls);
        let factory = Factory::linear(vec![1.0, 3.0, 5.0]).unwrap();

        let outcome =
            execute_with_zne_detailed(&circuit(), &exec, factory, &NoiseScaler::Global).unwrap();

        assert_eq!(calls.get(), 3);
        // 3, 9, 15 ops: values 0.97, 0.91, 0.85; line through them hits 1.0 at 0
        assert_abs_diff_eq!(outcome.zero_noise_value, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(outcome.unmitigated_value().unwrap(), 0.97, epsilon = 1e-12);
        assert_eq!(outcome.data_points.len(), 3);
    }

    /// Circuit stand-in that counts how many circuits are built from it.
    #[derive(Clone)]
    struct CountingCircuit<'a> {
        ops: Vec<u8>,
        built: &'a Cell<usize>,
    }

    impl Foldable for CountingCircuit<'_> {
        type Op = u8;

        fn num_qubits(&self) -> usize {
            1
        }

        fn operations(&self) -> &[u8] {
            &self.ops
        }

        fn inverse(op: &u8) -> Option<u8> {
            Some(*op)
        }

        fn with_operations(&self, ops: Vec<u8>) -> Self {
            self.built.set(self.built.get() + 1);
            Self {
                ops,
                built: self.built,
            }
        }
    }

    #[test]
    fn test_each_factor_folded_once() {
        let built = Cell::new(0);
        let circuit = CountingCircuit {
            ops: vec![0, 1, 2],
            built: &built,
        };
        let exec = |c: &CountingCircuit<'_>| -> Result<f64, String> {
            Ok(1.0 - 0.01 * c.ops.len() as f64)
        };
        let factory = Factory::linear(vec![1.0, 3.0, 5.0]).unwrap();

        let estimate = execute_with_zne(&circuit, &exec, factory, &NoiseScaler::Global).unwrap();

        assert_eq!(built.get(), 3);
        assert_abs_diff_eq!(estimate, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reduce_is_cached_after_run() {
        let calls = Cell::new(0);
        let exec = length_executor(&calls);
        let mut factory = Factory::richardson(vec![1.0, 3.0]).unwrap();
        let scaler = NoiseScaler::Global;

        let first = run_factory(&circuit(), &exec, &mut factory, &scaler).unwrap();
        let second = run_factory(&circuit(), &exec, &mut factory, &scaler).unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(first, second);
        assert_eq!(factory.reduce().unwrap(), first);
    }

    #[test]
    fn test_executor_error_propagates() {
        let calls = Cell::new(0);
        let exec = |c: &Circuit| -> Result<f64, String> {
            calls.set(calls.get() + 1);
            if c.num_ops() > 3 {
                Err("backend rejected circuit".to_string())
            } else {
                Ok(0.5)
            }
        };
        let factory = Factory::linear(vec![1.0, 3.0, 5.0]).unwrap();

        let err = execute_with_zne(&circuit(), &exec, factory, &NoiseScaler::Global).unwrap_err();

        assert!(matches!(err, ZneError::ExecutorFailure(_)));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_fit_error_propagates() {
        let exec = |_: &Circuit| -> Result<f64, String> { Ok(0.25) };
        let factory = Factory::exponential(vec![1.0, 2.0, 3.0], None).unwrap();

        let err = execute_with_zne(&circuit(), &exec, factory, &NoiseScaler::default()).unwrap_err();

        assert!(matches!(err, ZneError::FitDidNotConverge(_)));
    }

    #[test]
    fn test_invalid_circuit_for_global_folding() {
        let q = QubitId(0);
        let mut mid_measure = Circuit::with_size("mid", 1, 1);
        mid_measure.h(q).unwrap();
        mid_measure.measure(q, ClbitId(0)).unwrap();
        mid_measure.x(q).unwrap();
        let exec = |_: &Circuit| -> Result<f64, String> { Ok(0.0) };

        let err = execute_with_zne(
            &mid_measure,
            &exec,
            Factory::linear(vec![1.0, 3.0]).unwrap(),
            &NoiseScaler::Global,
        )
        .unwrap_err();
        assert!(matches!(err, ZneError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_factory_reset_before_use() {
        let calls = Cell::new(0);
        let exec = length_executor(&calls);
        let mut factory = Factory::linear(vec![1.0, 3.0]).unwrap();
        factory.push_result(1.0, 0.0).unwrap();

        execute_with_zne(&circuit(), &exec, factory, &NoiseScaler::Global).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_mitigated_executor_fresh_per_call() {
        let seen = RefCell::new(Vec::new());
        let exec = |c: &Circuit| -> Result<f64, String> {
            seen.borrow_mut().push(c.num_ops());
            Ok(1.0 - 0.01 * c.num_ops() as f64)
        };
        let config = ZneConfig::new()
            .with_scale_factors(vec![1.0, 3.0])
            .with_scaler(NoiseScaler::Global)
            .with_extrapolation(Extrapolation::Linear);
        let mitigated = mitigate_executor(exec, &config).unwrap();

        let a = Executor::execute(&mitigated, &circuit()).unwrap();
        let b = Executor::execute(&mitigated, &circuit()).unwrap();

        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        assert_eq!(*seen.borrow(), vec![3, 9, 3, 9]);
        assert_eq!(mitigated.factory().state(), FactoryState::Configured);
    }

    #[test]
    fn test_mitigated_executor_rejects_bad_config() {
        let exec = |_: &Circuit| -> Result<f64, String> { Ok(0.0) };
        let config = ZneConfig::new().with_scale_factors(vec![1.0, 0.9]);
        assert!(matches!(
            MitigatedExecutor::new(exec, &config),
            Err(ZneError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_adaptive_run() {
        // The executor sees the achieved scale factor (folded length over 3),
        // which differs from the requested one off the odd integers, so the
        // estimate is close to but not exactly the true 0.9.
        let exec = |c: &Circuit| -> Result<f64, String> {
            let scale = c.num_ops() as f64 / 3.0;
            Ok(0.4 * (-0.7 * scale).exp() + 0.5)
        };
        let factory = Factory::adaptive(
            AdaptiveConfig::new()
                .with_initial_scale_factor(3.0)
                .with_asymptote(0.5)
                .with_max_iterations(10),
        )
        .unwrap();

        let outcome =
            execute_with_zne_detailed(&circuit(), &exec, factory, &NoiseScaler::Global).unwrap();
        assert_abs_diff_eq!(outcome.zero_noise_value, 0.9, epsilon = 0.01);
        assert_eq!(outcome.data_points[0].scale_factor, 1.0);
        assert_eq!(outcome.data_points[1].scale_factor, 3.0);
        assert_eq!(outcome.fit.model, Extrapolation::Exponential { asymptote: Some(0.5) });
    }
}
