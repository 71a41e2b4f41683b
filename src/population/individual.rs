//! Individual type
//!
//! An individual couples a bounded genotype with its fitness and the self-adaptive
//! strategy parameters its mutation operator needs.

use std::cmp::Ordering;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EvoResult;
use crate::genome::euclidean_distance;
use crate::hyperparameter::self_adaptive::StrategyParams;

/// An individual in the population
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Genotype; every coordinate lies within the configured bounds
    pub(crate) values: Vec<f64>,
    /// Fitness (None if not yet evaluated); higher is better
    pub(crate) fitness: Option<f64>,
    /// Probability of being picked as a parent, recomputed on every selection pass
    pub(crate) selection_probability: f64,
    /// Self-adaptive mutation state
    pub(crate) strategy: StrategyParams,
}

impl Individual {
    /// Create an unevaluated individual from raw parts
    pub fn new(values: Vec<f64>, strategy: StrategyParams) -> Self {
        Self {
            values,
            fitness: None,
            selection_probability: 0.0,
            strategy,
        }
    }

    /// Create an individual with a known fitness and no self-adaptive state
    pub fn with_fitness(values: Vec<f64>, fitness: f64) -> Self {
        Self {
            fitness: Some(fitness),
            ..Self::new(values, StrategyParams::Fixed)
        }
    }

    /// Draw every coordinate uniformly within the bounds; step sizes start at the
    /// configured constant
    pub fn random<R: Rng>(config: &EngineConfig, rng: &mut R) -> Self {
        let values = (0..config.dimension)
            .map(|_| config.bounds.sample(rng))
            .collect();
        Self::new(values, Self::fresh_strategy(config))
    }

    /// Copy a genotype into a new individual with fresh strategy parameters
    ///
    /// Offspring never inherit step sizes through recombination; only mutation changes them.
    pub fn from_values(values: &[f64], config: &EngineConfig) -> Self {
        Self::new(values.to_vec(), Self::fresh_strategy(config))
    }

    fn fresh_strategy(config: &EngineConfig) -> StrategyParams {
        StrategyParams::initial(config.mutation, config.dimension, config.step_size)
    }

    /// Apply the configured mutation operator in place
    ///
    /// Clears the fitness, since the genotype changed.
    pub fn mutate<R: Rng>(&mut self, config: &EngineConfig, rng: &mut R) -> EvoResult<()> {
        config.mutation.apply(self, config, rng)
    }

    /// Genotype
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of coordinates
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Fitness, if evaluated
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Fitness, treating unevaluated individuals as worst
    pub fn fitness_or_worst(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }

    /// Set the fitness value
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Check if this individual has been evaluated
    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Selection probability from the last parent-selection pass
    pub fn selection_probability(&self) -> f64 {
        self.selection_probability
    }

    /// Self-adaptive mutation state
    pub fn strategy(&self) -> &StrategyParams {
        &self.strategy
    }

    /// Euclidean distance between genotypes
    pub fn distance(&self, other: &Self) -> f64 {
        euclidean_distance(&self.values, &other.values)
    }

    /// Check if this individual is better than another
    pub fn is_better_than(&self, other: &Self) -> bool {
        match (self.fitness, other.fitness) {
            (Some(f1), Some(f2)) => f1 > f2,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Ascending fitness order (worst first); unevaluated individuals sort lowest
pub fn by_fitness(a: &Individual, b: &Individual) -> Ordering {
    a.fitness_or_worst()
        .partial_cmp(&b.fitness_or_worst())
        .unwrap_or(Ordering::Equal)
}
