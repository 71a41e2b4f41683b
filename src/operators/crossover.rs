//! Recombination operators
//!
//! Every operator turns two parent genotypes into two child genotypes of the same
//! dimension. Children are clamped into the bounds, which matters for BLX-α since it
//! can extrapolate beyond both parents.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvoResult, EvolutionError};
use crate::genome::bounds::Bounds;

/// Recombination strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recombination {
    /// Average the parents at one random coordinate
    SingleArithmetic,
    /// Average the parents from a random cut point onward
    SimpleArithmetic,
    /// Blend the whole genotypes with one random factor
    #[default]
    WholeArithmetic,
    /// BLX-α: per-coordinate blend that may extrapolate by up to α
    Blend { alpha: f64 },
}

impl Recombination {
    /// Standard BLX-0.5
    pub fn blend() -> Self {
        Self::Blend { alpha: 0.5 }
    }

    pub(crate) fn validate(&self) -> EvoResult<()> {
        match self {
            Self::Blend { alpha } if !(alpha.is_finite() && *alpha >= 0.0) => {
                Err(EvolutionError::Configuration(format!(
                    "blend alpha must be finite and non-negative, got {}",
                    alpha
                )))
            }
            _ => Ok(()),
        }
    }

    /// Produce two children from two parents
    pub fn recombine<R: Rng>(
        &self,
        parent1: &[f64],
        parent2: &[f64],
        bounds: &Bounds,
        rng: &mut R,
    ) -> EvoResult<(Vec<f64>, Vec<f64>)> {
        if parent1.len() != parent2.len() {
            return Err(EvolutionError::DimensionMismatch {
                expected: parent1.len(),
                actual: parent2.len(),
            });
        }
        if parent1.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let (mut child1, mut child2) = match self {
            Self::SingleArithmetic => single_arithmetic(parent1, parent2, rng),
            Self::SimpleArithmetic => simple_arithmetic(parent1, parent2, rng),
            Self::WholeArithmetic => whole_arithmetic(parent1, parent2, rng),
            Self::Blend { alpha } => blend(parent1, parent2, *alpha, rng),
        };
        bounds.clamp_all(&mut child1);
        bounds.clamp_all(&mut child2);
        Ok((child1, child2))
    }
}

fn single_arithmetic<R: Rng>(p1: &[f64], p2: &[f64], rng: &mut R) -> (Vec<f64>, Vec<f64>) {
    let k = rng.gen_range(0..p1.len());
    let mid = 0.5 * (p1[k] + p2[k]);
    let mut child1 = p1.to_vec();
    let mut child2 = p2.to_vec();
    child1[k] = mid;
    child2[k] = mid;
    (child1, child2)
}

fn simple_arithmetic<R: Rng>(p1: &[f64], p2: &[f64], rng: &mut R) -> (Vec<f64>, Vec<f64>) {
    let cut = rng.gen_range(0..p1.len());
    let mut child1 = p1.to_vec();
    let mut child2 = p2.to_vec();
    for i in cut..p1.len() {
        let mid = 0.5 * (p1[i] + p2[i]);
        child1[i] = mid;
        child2[i] = mid;
    }
    (child1, child2)
}

fn whole_arithmetic<R: Rng>(p1: &[f64], p2: &[f64], rng: &mut R) -> (Vec<f64>, Vec<f64>) {
    let alpha: f64 = rng.gen();
    p1.iter()
        .zip(p2)
        .map(|(a, b)| (alpha * a + (1.0 - alpha) * b, (1.0 - alpha) * a + alpha * b))
        .unzip()
}

fn blend<R: Rng>(p1: &[f64], p2: &[f64], alpha: f64, rng: &mut R) -> (Vec<f64>, Vec<f64>) {
    p1.iter()
        .zip(p2)
        .map(|(a, b)| {
            let u: f64 = rng.gen();
            let gamma = (1.0 - 2.0 * alpha) * u - alpha;
            ((1.0 - gamma) * a + gamma * b, gamma * a + (1.0 - gamma) * b)
        })
        .unzip()
}
