//! Self-adaptive control mechanisms
//!
//! In self-adaptive evolution strategies, strategy parameters (like mutation step sizes)
//! are encoded in the individual and evolve alongside the solution parameters.

use std::f64::consts::{PI, TAU};

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{EvoResult, EvolutionError, NumericalError};
use crate::operators::mutation::MutationStrategy;

/// Strategy parameters carried by an individual
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StrategyParams {
    /// No self-adaptation; the configured step size is used as-is
    Fixed,

    /// Single shared step size (σ)
    OneStep(f64),

    /// Per-axis step sizes (σ₁, ..., σₙ)
    PerAxis(Vec<f64>),

    /// Per-axis step sizes plus rotation angles (α₁, ..., αₖ) where k = n(n-1)/2
    Correlated {
        step_sizes: Vec<f64>,
        angles: Vec<f64>,
    },
}

impl StrategyParams {
    /// Fresh strategy state for the given mutation operator
    ///
    /// Step sizes start at `step_size`, rotation angles at zero.
    pub fn initial(mutation: MutationStrategy, dimension: usize, step_size: f64) -> Self {
        match mutation {
            MutationStrategy::Uniform | MutationStrategy::NonUniform => Self::Fixed,
            MutationStrategy::UncorrelatedOneStep => Self::OneStep(step_size),
            MutationStrategy::UncorrelatedNStep => Self::PerAxis(vec![step_size; dimension]),
            MutationStrategy::Correlated => Self::Correlated {
                step_sizes: vec![step_size; dimension],
                angles: vec![0.0; num_angles(dimension)],
            },
        }
    }

    /// All self-adapted step sizes (empty for `Fixed`)
    pub fn step_sizes(&self) -> &[f64] {
        match self {
            Self::Fixed => &[],
            Self::OneStep(sigma) => std::slice::from_ref(sigma),
            Self::PerAxis(sigmas) => sigmas,
            Self::Correlated { step_sizes, .. } => step_sizes,
        }
    }

    /// Rotation angles (empty unless correlated)
    pub fn angles(&self) -> &[f64] {
        match self {
            Self::Correlated { angles, .. } => angles,
            _ => &[],
        }
    }

    /// Smallest step size, if any is self-adapted
    pub fn min_step_size(&self) -> Option<f64> {
        self.step_sizes().iter().copied().reduce(f64::min)
    }
}

/// Number of rotation angles for dimension `n`
pub fn num_angles(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Log-normal update of a single shared step size
///
/// σ' = max(ε, σ · exp(τ · N(0,1)))
pub fn adapt_one_step<R: Rng>(sigma: f64, rates: &LearningRates, rng: &mut R) -> f64 {
    let n: f64 = rng.sample(StandardNormal);
    (sigma * (rates.tau * n).exp()).max(rates.epsilon)
}

/// Log-normal update of per-axis step sizes
///
/// σᵢ' = max(ε, σᵢ · exp(τ' · N₀ + τ · Nᵢ)) with one global draw N₀ shared by all axes.
/// Returns the local draws Nᵢ so the caller can reuse them for the coordinate step.
pub fn adapt_per_axis<R: Rng>(sigmas: &mut [f64], rates: &LearningRates, rng: &mut R) -> Vec<f64> {
    let global: f64 = rng.sample(StandardNormal);
    sigmas
        .iter_mut()
        .map(|sigma| {
            let local: f64 = rng.sample(StandardNormal);
            *sigma = (*sigma * (rates.tau_prime * global + rates.tau * local).exp())
                .max(rates.epsilon);
            local
        })
        .collect()
}

/// Perturb rotation angles by β · N(0,1) and wrap them back into [-π, π]
///
/// Fails before drawing anything if an angle is not finite.
pub fn adapt_angles<R: Rng>(
    angles: &mut [f64],
    rates: &LearningRates,
    rng: &mut R,
) -> EvoResult<()> {
    if let Some(index) = angles.iter().position(|a| !a.is_finite()) {
        return Err(NumericalError::NonFiniteAngle { index }.into());
    }
    for angle in angles.iter_mut() {
        let n: f64 = rng.sample(StandardNormal);
        *angle = wrap_angle(*angle + rates.beta * n);
    }
    Ok(())
}

/// Wrap an angle into [-π, π]
///
/// Angles already in range are returned unchanged. Non-finite input yields NaN.
pub fn wrap_angle(angle: f64) -> f64 {
    if angle.abs() <= PI {
        return angle;
    }
    let turns = ((angle + PI) / TAU).floor();
    (angle - TAU * turns).clamp(-PI, PI)
}

/// Learning rate parameters for self-adaptation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LearningRates {
    /// Local learning rate τ (the only rate used by one-step mutation)
    pub tau: f64,
    /// Global learning rate τ'
    pub tau_prime: f64,
    /// Rotation angle step β (radians)
    pub beta: f64,
    /// Floor for every step size
    pub epsilon: f64,
}

impl LearningRates {
    /// Default rotation step: 5 degrees
    pub const DEFAULT_BETA: f64 = 0.0873;
    /// Default step-size floor
    pub const DEFAULT_EPSILON: f64 = 0.01;

    /// Default learning rates for n-step and correlated mutation in dimension n
    ///
    /// τ = 1/√(2√n), τ' = 1/√(2n)
    pub fn for_dimension(n: usize) -> Self {
        let n = n.max(1) as f64;
        Self {
            tau: 1.0 / (2.0 * n.sqrt()).sqrt(),
            tau_prime: 1.0 / (2.0 * n).sqrt(),
            beta: Self::DEFAULT_BETA,
            epsilon: Self::DEFAULT_EPSILON,
        }
    }

    /// Default learning rates for the given mutation operator
    ///
    /// One-step mutation uses τ = 1/√n.
    pub fn for_mutation(mutation: MutationStrategy, n: usize) -> Self {
        let rates = Self::for_dimension(n);
        match mutation {
            MutationStrategy::UncorrelatedOneStep => Self {
                tau: 1.0 / (n.max(1) as f64).sqrt(),
                ..rates
            },
            _ => rates,
        }
    }

    /// Create custom learning rates
    pub fn custom(tau: f64, tau_prime: f64, beta: f64, epsilon: f64) -> Self {
        Self {
            tau,
            tau_prime,
            beta,
            epsilon,
        }
    }

    /// Replace the step-size floor
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub(crate) fn validate(&self) -> EvoResult<()> {
        let all_finite = [self.tau, self.tau_prime, self.beta, self.epsilon]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite || self.tau < 0.0 || self.tau_prime < 0.0 || self.beta < 0.0 {
            return Err(EvolutionError::Configuration(format!(
                "learning rates must be finite and non-negative, got {:?}",
                self
            )));
        }
        if self.epsilon <= 0.0 {
            return Err(EvolutionError::Configuration(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}
