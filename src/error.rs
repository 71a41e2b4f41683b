//! Error types for evo-islands
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Numerical degeneracies detected by the operators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumericalError {
    /// Fitness-proportional selection over a population whose fitness sums to zero
    #[error("Fitness sum is zero; proportional selection is undefined")]
    ZeroFitnessSum,

    /// Fitness-proportional selection requires non-negative fitness
    #[error("Negative fitness {value} at index {index} in proportional selection")]
    NegativeFitness { index: usize, value: f64 },

    /// A fitness value was NaN or infinite
    #[error("Non-finite fitness at index {index}")]
    NonFiniteFitness { index: usize },

    /// A rotation angle was NaN or infinite
    #[error("Non-finite rotation angle at index {index}")]
    NonFiniteAngle { index: usize },

    /// The covariance matrix contains NaN or infinite entries
    #[error("Covariance matrix has non-finite entries")]
    NonFiniteCovariance,

    /// Cholesky factorization failed even after regularization
    #[error("Covariance matrix of dimension {dimension} is not positive definite")]
    CovarianceNotPositiveDefinite { dimension: usize },
}

/// Top-level error type for evolution operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvolutionError {
    /// Invalid or unsupported configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Numerical degeneracy
    #[error("Numerical error: {0}")]
    Numerical(#[from] NumericalError),

    /// A selection operator needed the fitness of an individual that was never evaluated
    #[error("Individual at index {index} has not been evaluated")]
    UnevaluatedIndividual { index: usize },

    /// Empty population
    #[error("Empty population")]
    EmptyPopulation,

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias for evolution operations
pub type EvoResult<T> = Result<T, EvolutionError>;

/// Signalled by an evaluator that has no evaluations left
///
/// This is a stop condition, not a fault: the engine maps it to
/// [`Progress::Exhausted`] instead of propagating it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Evaluation budget of {budget} exhausted")]
pub struct BudgetExhausted {
    /// The budget that was configured for the run
    pub budget: usize,
}

/// Outcome of an operation that consumes evaluation budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The operation completed and budget remains
    Running,
    /// The budget ran out; the population holds the last fully-evaluated state
    Exhausted,
}

impl Progress {
    /// Returns true if the run should stop
    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted)
    }
}
