//! Bounds for genotype values
//!
//! Every coordinate of every genotype lives in one shared closed interval.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvoResult, EvolutionError};

/// Closed interval `[min, max]` shared by all coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl Bounds {
    /// Create new bounds
    ///
    /// # Panics
    /// Panics if min > max
    pub fn new(min: f64, max: f64) -> Self {
        assert!(
            min <= max,
            "Invalid bounds: min ({}) must be <= max ({})",
            min,
            max
        );
        Self { min, max }
    }

    /// Create bounds from untrusted input
    pub fn try_new(min: f64, max: f64) -> EvoResult<Self> {
        let bounds = Self { min, max };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Create symmetric bounds centered at 0
    pub fn symmetric(half_width: f64) -> Self {
        Self::new(-half_width, half_width)
    }

    /// Check that the interval is finite and non-inverted
    pub fn validate(&self) -> EvoResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(EvolutionError::Configuration(format!(
                "bounds must be finite, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min >= self.max {
            return Err(EvolutionError::Configuration(format!(
                "bounds must satisfy min < max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Get the range (max - min)
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Check if a value is within bounds
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if every value of a slice is within bounds
    pub fn contains_all(&self, values: &[f64]) -> bool {
        values.iter().all(|&v| self.contains(v))
    }

    /// Clamp a value to be within bounds: `min(MAX, max(MIN, x))`
    pub fn clamp(&self, value: f64) -> f64 {
        self.max.min(self.min.max(value))
    }

    /// Clamp every value of a slice in place
    pub fn clamp_all(&self, values: &mut [f64]) {
        for value in values.iter_mut() {
            *value = self.clamp(*value);
        }
    }

    /// Draw a value uniformly from the interval
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        self.min + rng.gen::<f64>() * self.range()
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::symmetric(5.0)
    }
}

impl From<(f64, f64)> for Bounds {
    fn from((min, max): (f64, f64)) -> Self {
        Self::new(min, max)
    }
}
