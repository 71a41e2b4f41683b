//! Parent selection operators
//!
//! Probability-based strategies assign every individual a selection probability and
//! fill the mating pool with stochastic universal sampling. Tournament selection draws
//! parents directly and never computes probabilities.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{EvoResult, EvolutionError, NumericalError};
use crate::population::individual::Individual;

/// Parent selection strategy
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParentSelection {
    /// Every individual is equally likely
    Uniform,
    /// Probability proportional to fitness; fitness must be non-negative
    FitnessProportional,
    /// Linear ranking with selection pressure in [1, 2]
    LinearRank { pressure: f64 },
    /// Exponential ranking
    ExponentialRank,
    /// Best of `size` uniform draws with replacement
    Tournament { size: usize },
}

impl Default for ParentSelection {
    fn default() -> Self {
        Self::Tournament { size: 2 }
    }
}

/// Mating pool indices plus the probabilities they were sampled from
#[derive(Clone, Debug, PartialEq)]
pub struct ParentDraw {
    /// Indices into the population, one per mating-pool slot
    pub parents: Vec<usize>,
    /// Per-individual selection probabilities (`None` for tournament selection)
    pub probabilities: Option<Vec<f64>>,
}

impl ParentSelection {
    pub(crate) fn validate(&self) -> EvoResult<()> {
        match self {
            Self::LinearRank { pressure } if !(1.0..=2.0).contains(pressure) => {
                Err(EvolutionError::Configuration(format!(
                    "linear ranking pressure must be in [1, 2], got {}",
                    pressure
                )))
            }
            Self::Tournament { size: 0 } => Err(EvolutionError::Configuration(
                "tournament size must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Selection probabilities for the given fitness values
    ///
    /// Returns `None` for tournament selection, which does not use probabilities.
    pub fn probabilities(&self, fitness: &[f64]) -> EvoResult<Option<Vec<f64>>> {
        if fitness.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        check_finite(fitness)?;

        let probabilities = match self {
            Self::Uniform => uniform_probabilities(fitness.len()),
            Self::FitnessProportional => proportional_probabilities(fitness)?,
            Self::LinearRank { pressure } => linear_rank_probabilities(fitness, *pressure),
            Self::ExponentialRank => exponential_rank_probabilities(fitness),
            Self::Tournament { .. } => return Ok(None),
        };
        Ok(Some(probabilities))
    }

    /// Draw `count` parents
    pub fn select<R: Rng>(
        &self,
        fitness: &[f64],
        count: usize,
        rng: &mut R,
    ) -> EvoResult<ParentDraw> {
        match self.probabilities(fitness)? {
            Some(probabilities) => Ok(ParentDraw {
                parents: stochastic_universal_sampling(&probabilities, count, rng),
                probabilities: Some(probabilities),
            }),
            None => {
                let size = match self {
                    Self::Tournament { size } => *size,
                    _ => 1,
                };
                Ok(ParentDraw {
                    parents: tournament(fitness, size, count, rng),
                    probabilities: None,
                })
            }
        }
    }
}

fn check_finite(fitness: &[f64]) -> EvoResult<()> {
    match fitness.iter().position(|f| !f.is_finite()) {
        Some(index) => Err(NumericalError::NonFiniteFitness { index }.into()),
        None => Ok(()),
    }
}

/// Fitness of every individual; fails on the first unevaluated one
pub fn fitness_values(individuals: &[Individual]) -> EvoResult<Vec<f64>> {
    individuals
        .iter()
        .enumerate()
        .map(|(index, ind)| {
            ind.fitness()
                .ok_or(EvolutionError::UnevaluatedIndividual { index })
        })
        .collect()
}

/// 1/N for every individual
pub fn uniform_probabilities(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// fitness / sum(fitness)
pub fn proportional_probabilities(fitness: &[f64]) -> EvoResult<Vec<f64>> {
    if let Some(index) = fitness.iter().position(|&f| f < 0.0) {
        return Err(NumericalError::NegativeFitness {
            index,
            value: fitness[index],
        }
        .into());
    }
    let total: f64 = fitness.iter().sum();
    if total <= 0.0 {
        return Err(NumericalError::ZeroFitnessSum.into());
    }
    Ok(fitness.iter().map(|f| f / total).collect())
}

/// Indices sorted worst first; position in the result is the rank counted from the worst
fn ranking(fitness: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| {
        fitness[a]
            .partial_cmp(&fitness[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Linear ranking: (2 - s)/N + 2p(s - 1)/(N(N - 1)) for rank p counted from the worst
pub fn linear_rank_probabilities(fitness: &[f64], pressure: f64) -> Vec<f64> {
    let n = fitness.len();
    if n == 1 {
        return vec![1.0];
    }
    let nf = n as f64;
    let mut probabilities = vec![0.0; n];
    for (rank, &index) in ranking(fitness).iter().enumerate() {
        probabilities[index] =
            (2.0 - pressure) / nf + 2.0 * rank as f64 * (pressure - 1.0) / (nf * (nf - 1.0));
    }
    probabilities
}

/// Exponential ranking: weight 1 - e^(-p) for rank p counted from the worst, normalized
pub fn exponential_rank_probabilities(fitness: &[f64]) -> Vec<f64> {
    let n = fitness.len();
    if n == 1 {
        return vec![1.0];
    }
    let mut weights = vec![0.0; n];
    for (rank, &index) in ranking(fitness).iter().enumerate() {
        weights[index] = 1.0 - (-(rank as f64)).exp();
    }
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

/// Stochastic universal sampling
///
/// One uniform offset in `[0, 1/count)` and `count` evenly spaced pointers over the
/// cumulative distribution. Each pointer picks the first individual with non-zero
/// probability whose cumulative probability reaches it.
pub fn stochastic_universal_sampling<R: Rng>(
    probabilities: &[f64],
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let Some(last) = probabilities.iter().rposition(|&p| p > 0.0) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }

    let spacing = 1.0 / count as f64;
    let mut pointer = rng.gen::<f64>() * spacing;
    let mut index = 0;
    let mut cumulative = probabilities[0];
    let mut selected = Vec::with_capacity(count);

    while selected.len() < count {
        // float drift near 1.0 is absorbed by stopping at the last candidate
        while (cumulative < pointer || probabilities[index] <= 0.0) && index < last {
            index += 1;
            cumulative += probabilities[index];
        }
        selected.push(index);
        pointer += spacing;
    }
    selected
}

/// Run `count` tournaments of `size` uniform draws with replacement
///
/// Ties go to the contestant drawn first.
pub fn tournament<R: Rng>(fitness: &[f64], size: usize, count: usize, rng: &mut R) -> Vec<usize> {
    if fitness.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|_| {
            let mut winner = rng.gen_range(0..fitness.len());
            for _ in 1..size {
                let contestant = rng.gen_range(0..fitness.len());
                if fitness[contestant] > fitness[winner] {
                    winner = contestant;
                }
            }
            winner
        })
        .collect()
}

/// Sharing function: 1 - d/σ inside the niche radius, 0 outside
pub fn sharing(distance: f64, sigma_share: f64) -> f64 {
    if distance <= sigma_share {
        1.0 - distance / sigma_share
    } else {
        0.0
    }
}

fn niche_count(individuals: &[Individual], i: usize, sigma_share: f64) -> f64 {
    individuals
        .iter()
        .map(|other| sharing(individuals[i].distance(other), sigma_share))
        .sum()
}

/// Fitness penalized by each individual's niche count
///
/// Non-negative fitness is divided by the count and negative fitness multiplied by it,
/// so crowding always lowers fitness. Every individual is within distance 0 of itself,
/// so the count is at least 1.
pub fn shared_fitness(individuals: &[Individual], sigma_share: f64) -> EvoResult<Vec<f64>> {
    let raw = fitness_values(individuals)?;

    #[cfg(feature = "parallel")]
    let counts: Vec<f64> = (0..individuals.len())
        .into_par_iter()
        .map(|i| niche_count(individuals, i, sigma_share))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let counts: Vec<f64> = (0..individuals.len())
        .map(|i| niche_count(individuals, i, sigma_share))
        .collect();

    Ok(raw
        .iter()
        .zip(counts)
        .map(|(&f, c)| if f < 0.0 { f * c } else { f / c })
        .collect())
}
