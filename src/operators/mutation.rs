//! Mutation operators
//!
//! Five strategies, from plain uniform resetting to correlated self-adaptive mutation.
//! Every operator clamps the genotype back into the bounds and keeps every
//! self-adapted step size at or above the epsilon floor.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::EngineConfig;
use crate::error::{EvoResult, EvolutionError};
use crate::genome::bounds::Bounds;
use crate::hyperparameter::self_adaptive::{
    adapt_angles, adapt_one_step, adapt_per_axis, LearningRates, StrategyParams,
};
use crate::operators::covariance::CovarianceSampler;
use crate::population::individual::Individual;

/// Mutation operator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStrategy {
    /// Replace each coordinate with a fresh in-range draw with probability `mutation_rate`
    Uniform,
    /// Add `step_size · N(0,1)` to every coordinate; the step size never changes
    NonUniform,
    /// One self-adapted step size shared by all coordinates
    UncorrelatedOneStep,
    /// One self-adapted step size per coordinate
    #[default]
    UncorrelatedNStep,
    /// Per-coordinate step sizes plus rotation angles (full covariance)
    Correlated,
}

impl MutationStrategy {
    /// Mutate the individual in place
    pub fn apply<R: Rng>(
        &self,
        individual: &mut Individual,
        config: &EngineConfig,
        rng: &mut R,
    ) -> EvoResult<()> {
        if individual.values.len() != config.dimension {
            return Err(EvolutionError::DimensionMismatch {
                expected: config.dimension,
                actual: individual.values.len(),
            });
        }
        if !self.matches(&individual.strategy) {
            individual.strategy =
                StrategyParams::initial(*self, config.dimension, config.step_size);
        }

        let bounds = config.bounds;
        let rates = config.learning_rates();
        match self {
            Self::Uniform => uniform(&mut individual.values, config.mutation_rate, &bounds, rng),
            Self::NonUniform => {
                non_uniform(&mut individual.values, config.step_size, &bounds, rng)
            }
            Self::UncorrelatedOneStep => {
                if let StrategyParams::OneStep(sigma) = &mut individual.strategy {
                    *sigma = one_step(&mut individual.values, *sigma, &rates, &bounds, rng);
                }
            }
            Self::UncorrelatedNStep => {
                if let StrategyParams::PerAxis(sigmas) = &mut individual.strategy {
                    n_step(&mut individual.values, sigmas, &rates, &bounds, rng);
                }
            }
            Self::Correlated => {
                if let StrategyParams::Correlated { step_sizes, angles } = &mut individual.strategy
                {
                    correlated(&mut individual.values, step_sizes, angles, &rates, &bounds, rng)?;
                }
            }
        }

        individual.fitness = None;
        Ok(())
    }

    fn matches(&self, params: &StrategyParams) -> bool {
        matches!(
            (self, params),
            (Self::Uniform | Self::NonUniform, StrategyParams::Fixed)
                | (Self::UncorrelatedOneStep, StrategyParams::OneStep(_))
                | (Self::UncorrelatedNStep, StrategyParams::PerAxis(_))
                | (Self::Correlated, StrategyParams::Correlated { .. })
        )
    }
}

fn uniform<R: Rng>(values: &mut [f64], rate: f64, bounds: &Bounds, rng: &mut R) {
    for value in values.iter_mut() {
        if rng.gen::<f64>() < rate {
            *value = bounds.sample(rng);
        }
    }
}

fn non_uniform<R: Rng>(values: &mut [f64], step_size: f64, bounds: &Bounds, rng: &mut R) {
    for value in values.iter_mut() {
        let n: f64 = rng.sample(StandardNormal);
        *value = bounds.clamp(*value + step_size * n);
    }
}

/// Returns the updated step size
fn one_step<R: Rng>(
    values: &mut [f64],
    sigma: f64,
    rates: &LearningRates,
    bounds: &Bounds,
    rng: &mut R,
) -> f64 {
    let sigma = adapt_one_step(sigma, rates, rng);
    for value in values.iter_mut() {
        let n: f64 = rng.sample(StandardNormal);
        *value = bounds.clamp(*value + sigma * n);
    }
    sigma
}

// The local draw of each axis moves both its step size and its coordinate.
fn n_step<R: Rng>(
    values: &mut [f64],
    sigmas: &mut [f64],
    rates: &LearningRates,
    bounds: &Bounds,
    rng: &mut R,
) {
    let draws = adapt_per_axis(sigmas, rates, rng);
    for ((value, sigma), n) in values.iter_mut().zip(sigmas.iter()).zip(draws) {
        *value = bounds.clamp(*value + sigma * n);
    }
}

fn correlated<R: Rng>(
    values: &mut [f64],
    step_sizes: &mut [f64],
    angles: &mut [f64],
    rates: &LearningRates,
    bounds: &Bounds,
    rng: &mut R,
) -> EvoResult<()> {
    adapt_per_axis(step_sizes, rates, rng);
    adapt_angles(angles, rates, rng)?;

    let sampler = CovarianceSampler::new(step_sizes, angles, rates.epsilon * rates.epsilon)?;
    let delta = sampler.sample(rng);
    trace!(
        regularized = sampler.was_regularized(),
        "correlated mutation step drawn"
    );

    for (value, d) in values.iter_mut().zip(delta) {
        *value = bounds.clamp(*value + d);
    }
    Ok(())
}
