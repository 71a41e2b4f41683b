//! Genotype support
//!
//! Genotypes are plain `Vec<f64>` bounded by a shared [`bounds::Bounds`] interval.

pub mod bounds;

/// Euclidean distance between two genotypes
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

pub mod prelude {
    pub use super::bounds::*;
    pub use super::euclidean_distance;
}
