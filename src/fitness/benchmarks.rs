//! Benchmark objectives
//!
//! Classic continuous test functions. Each is stated as a value to minimize and exposed
//! to the engine, which maximizes, as its negation.

use std::f64::consts::{E, PI};

use crate::fitness::traits::Objective;
use crate::genome::bounds::Bounds;

/// A benchmark function with known optimum
pub trait BenchmarkFunction: Send + Sync {
    /// Name of the benchmark function
    fn name(&self) -> &'static str;

    /// Dimensionality of the problem
    fn dimension(&self) -> usize;

    /// Customary search interval
    fn bounds(&self) -> Bounds {
        Bounds::symmetric(5.0)
    }

    /// Location of the minimum
    fn optimum(&self) -> Vec<f64> {
        vec![0.0; self.dimension()]
    }

    /// Raw value, to be minimized; zero at the optimum
    fn evaluate_raw(&self, x: &[f64]) -> f64;
}

macro_rules! negated_objective {
    ($($benchmark:ty),+ $(,)?) => {
        $(
            impl Objective for $benchmark {
                fn evaluate(&self, values: &[f64]) -> f64 {
                    -self.evaluate_raw(values)
                }
            }
        )+
    };
}

negated_objective!(Sphere, Rastrigin, Rosenbrock, Ackley, BentCigar);

/// Sphere: Σxᵢ²
#[derive(Clone, Debug)]
pub struct Sphere {
    dimension: usize,
}

impl Sphere {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Sphere {
    fn name(&self) -> &'static str {
        "sphere"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.iter().map(|xi| xi * xi).sum()
    }
}

/// Rastrigin: 10n + Σ(xᵢ² − 10cos(2πxᵢ))
///
/// Highly multimodal; the usual target for fitness sharing and island runs.
#[derive(Clone, Debug)]
pub struct Rastrigin {
    dimension: usize,
}

impl Rastrigin {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Rastrigin {
    fn name(&self) -> &'static str {
        "rastrigin"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> Bounds {
        Bounds::symmetric(5.12)
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        10.0 * x.len() as f64
            + x.iter()
                .map(|xi| xi * xi - 10.0 * (2.0 * PI * xi).cos())
                .sum::<f64>()
    }
}

/// Rosenbrock: Σ 100(xᵢ₊₁ − xᵢ²)² + (1 − xᵢ)²
#[derive(Clone, Debug)]
pub struct Rosenbrock {
    dimension: usize,
}

impl Rosenbrock {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Rosenbrock {
    fn name(&self) -> &'static str {
        "rosenbrock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn optimum(&self) -> Vec<f64> {
        vec![1.0; self.dimension]
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.windows(2)
            .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
            .sum()
    }
}

/// Ackley with a = 20, b = 0.2, c = 2π
#[derive(Clone, Debug)]
pub struct Ackley {
    dimension: usize,
}

impl Ackley {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Ackley {
    fn name(&self) -> &'static str {
        "ackley"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let n = x.len() as f64;
        let mean_sq = x.iter().map(|xi| xi * xi).sum::<f64>() / n;
        let mean_cos = x.iter().map(|xi| (2.0 * PI * xi).cos()).sum::<f64>() / n;
        -20.0 * (-0.2 * mean_sq.sqrt()).exp() - mean_cos.exp() + 20.0 + E
    }
}

/// Bent cigar: x₁² + 10⁶ Σᵢ₌₂ xᵢ²
///
/// Unimodal but badly conditioned; rewards correlated and per-axis step sizes.
#[derive(Clone, Debug)]
pub struct BentCigar {
    dimension: usize,
}

impl BentCigar {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for BentCigar {
    fn name(&self) -> &'static str {
        "bent_cigar"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        match x.split_first() {
            Some((head, tail)) => head * head + 1e6 * tail.iter().map(|xi| xi * xi).sum::<f64>(),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn all(dimension: usize) -> Vec<Box<dyn BenchmarkFunction>> {
        vec![
            Box::new(Sphere::new(dimension)),
            Box::new(Rastrigin::new(dimension)),
            Box::new(Rosenbrock::new(dimension)),
            Box::new(Ackley::new(dimension)),
            Box::new(BentCigar::new(dimension)),
        ]
    }

    #[test]
    fn test_zero_at_optimum() {
        for f in all(4) {
            assert_relative_eq!(f.evaluate_raw(&f.optimum()), 0.0, epsilon = 1e-10);
            assert_eq!(f.optimum().len(), 4);
        }
    }

    #[test]
    fn test_positive_away_from_optimum() {
        for f in all(3) {
            let x: Vec<f64> = f.optimum().iter().map(|v| v + 0.5).collect();
            assert!(f.evaluate_raw(&x) > 0.0, "{}", f.name());
        }
    }

    #[test]
    fn test_objective_is_negated() {
        let sphere = Sphere::new(3);
        assert_relative_eq!(Objective::evaluate(&sphere, &[1.0, 2.0, 3.0]), -14.0);

        let cigar = BentCigar::new(2);
        assert_relative_eq!(Objective::evaluate(&cigar, &[2.0, 1.0]), -1_000_004.0);
    }

    #[test]
    fn test_rosenbrock_value() {
        // 100 * (1 - 0)^2 + (1 - 0)^2
        assert_relative_eq!(Rosenbrock::new(2).evaluate_raw(&[0.0, 1.0]), 101.0);
    }

    #[test]
    fn test_rastrigin_integer_points() {
        // cos(2πk) = 1, so only the quadratic term remains
        assert_relative_eq!(
            Rastrigin::new(2).evaluate_raw(&[1.0, -2.0]),
            5.0,
            epsilon = 1e-10
        );
        assert_eq!(Rastrigin::new(2).bounds(), Bounds::symmetric(5.12));
    }
}
