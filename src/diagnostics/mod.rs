//! Diagnostics and statistics
//!
//! Per-generation summaries of a population and a run-level history built from them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::genome::euclidean_distance;
use crate::population::individual::Individual;

/// Fitness and diversity summary of one generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number
    pub generation: usize,
    /// Evaluations charged so far
    pub evaluations: usize,
    /// Number of evaluated individuals the fitness figures cover
    pub evaluated: usize,
    /// Best fitness
    pub best_fitness: f64,
    /// Worst fitness
    pub worst_fitness: f64,
    /// Mean fitness
    pub mean_fitness: f64,
    /// Sample standard deviation of fitness
    pub fitness_std: f64,
    /// Mean pairwise Euclidean distance between genotypes
    pub diversity: f64,
}

impl GenerationStats {
    /// Summarize a set of individuals; unevaluated ones only count toward diversity
    pub fn from_individuals(
        generation: usize,
        evaluations: usize,
        individuals: &[Individual],
    ) -> Self {
        let fitness: Vec<f64> = individuals.iter().filter_map(Individual::fitness).collect();
        let n = fitness.len();

        let (best, worst, mean, std) = if n == 0 {
            (f64::NEG_INFINITY, f64::INFINITY, 0.0, 0.0)
        } else {
            let best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let worst = fitness.iter().copied().fold(f64::INFINITY, f64::min);
            let mean = fitness.iter().sum::<f64>() / n as f64;
            let std = if n > 1 {
                (fitness.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
            } else {
                0.0
            };
            (best, worst, mean, std)
        };

        Self {
            generation,
            evaluations,
            evaluated: n,
            best_fitness: best,
            worst_fitness: worst,
            mean_fitness: mean,
            fitness_std: std,
            diversity: diversity(individuals),
        }
    }
}

fn distances_from(individuals: &[Individual], i: usize) -> f64 {
    individuals[i + 1..]
        .iter()
        .map(|other| euclidean_distance(individuals[i].values(), other.values()))
        .sum()
}

/// Mean pairwise Euclidean distance; zero for fewer than two individuals
pub fn diversity(individuals: &[Individual]) -> f64 {
    let n = individuals.len();
    if n < 2 {
        return 0.0;
    }

    #[cfg(feature = "parallel")]
    let total: f64 = (0..n)
        .into_par_iter()
        .map(|i| distances_from(individuals, i))
        .sum();

    #[cfg(not(feature = "parallel"))]
    let total: f64 = (0..n).map(|i| distances_from(individuals, i)).sum();

    total / (n * (n - 1) / 2) as f64
}

/// History of a whole run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// One entry per recorded generation, the initial population included
    pub generations: Vec<GenerationStats>,
    /// Wall-clock runtime in milliseconds
    pub total_runtime_ms: f64,
}

impl EvolutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a generation
    pub fn record(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    /// Store the run time
    pub fn set_runtime(&mut self, elapsed: Duration) {
        self.total_runtime_ms = elapsed.as_secs_f64() * 1000.0;
    }

    /// Number of recorded generations
    pub fn num_generations(&self) -> usize {
        self.generations.len()
    }

    /// Highest best-fitness over the run
    pub fn best_fitness(&self) -> Option<f64> {
        self.generations
            .iter()
            .map(|g| g.best_fitness)
            .reduce(f64::max)
    }

    /// Best fitness of the last recorded generation
    pub fn final_best_fitness(&self) -> Option<f64> {
        self.generations.last().map(|g| g.best_fitness)
    }

    pub fn best_fitness_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.best_fitness).collect()
    }

    pub fn mean_fitness_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.mean_fitness).collect()
    }

    pub fn diversity_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.diversity).collect()
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub mod prelude {
    pub use super::{diversity, EvolutionStats, GenerationStats};
}
