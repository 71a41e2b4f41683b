//! Survivor selection operators
//!
//! Decide which of the current parents and freshly evaluated offspring form the next
//! population. Every strategy returns exactly the requested number of individuals.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvoResult, EvolutionError};
use crate::operators::selection::fitness_values;
use crate::population::individual::{by_fitness, Individual};

/// Survivor selection strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurvivorSelection {
    /// Offspring replace the parents
    Generational,
    /// Best of parents and offspring combined
    #[default]
    MuPlusLambda,
    /// Repeated `size`-way tournaments over parents and offspring combined
    Tournament { size: usize },
}

impl SurvivorSelection {
    pub(crate) fn validate(&self) -> EvoResult<()> {
        match self {
            Self::Tournament { size: 0 } => Err(EvolutionError::Configuration(
                "survivor tournament size must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Build the next population of `size` individuals
    ///
    /// Every individual must be evaluated.
    pub fn select<R: Rng>(
        &self,
        parents: Vec<Individual>,
        offspring: Vec<Individual>,
        size: usize,
        rng: &mut R,
    ) -> EvoResult<Vec<Individual>> {
        fitness_values(&parents)?;
        fitness_values(&offspring)?;

        match self {
            Self::Generational => {
                if offspring.len() < size {
                    return Err(EvolutionError::Configuration(format!(
                        "generational replacement needs {} offspring, got {}",
                        size,
                        offspring.len()
                    )));
                }
                Ok(truncate_best(offspring, size))
            }
            Self::MuPlusLambda => {
                let union = join(parents, offspring, size)?;
                Ok(truncate_best(union, size))
            }
            Self::Tournament { size: k } => {
                let union = join(parents, offspring, size)?;
                Ok(tournament_survivors(union, *k, size, rng))
            }
        }
    }
}

fn join(
    mut parents: Vec<Individual>,
    offspring: Vec<Individual>,
    size: usize,
) -> EvoResult<Vec<Individual>> {
    parents.extend(offspring);
    if parents.len() < size {
        return Err(EvolutionError::Configuration(format!(
            "cannot keep {} survivors out of {} individuals",
            size,
            parents.len()
        )));
    }
    Ok(parents)
}

/// Keep the best `n` individuals, best first
///
/// The sort is stable, so among equal fitness earlier individuals win.
pub fn truncate_best(mut individuals: Vec<Individual>, n: usize) -> Vec<Individual> {
    individuals.sort_by(|a, b| by_fitness(b, a));
    individuals.truncate(n);
    individuals
}

fn tournament_survivors<R: Rng>(
    mut pool: Vec<Individual>,
    k: usize,
    size: usize,
    rng: &mut R,
) -> Vec<Individual> {
    let mut next = Vec::with_capacity(size);
    while next.len() < size && !pool.is_empty() {
        let mut winner = rng.gen_range(0..pool.len());
        for _ in 1..k {
            let contestant = rng.gen_range(0..pool.len());
            if pool[contestant].is_better_than(&pool[winner]) {
                winner = contestant;
            }
        }
        next.push(pool.swap_remove(winner));
    }
    next
}
