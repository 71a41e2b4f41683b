//! Genetic operators
//!
//! Parent selection, recombination, mutation, and survivor selection, plus the
//! correlated Gaussian sampler behind correlated mutation.

pub mod covariance;
pub mod crossover;
pub mod mutation;
pub mod selection;
pub mod survivor;

pub mod prelude {
    pub use super::covariance::*;
    pub use super::crossover::*;
    pub use super::mutation::*;
    pub use super::selection::*;
    pub use super::survivor::*;
}
