//! Objective and evaluator traits
//!
//! An [`Objective`] is the black-box function itself. An [`Evaluator`] sits between the
//! engine and the objective and charges every call against a fixed evaluation budget.

use crate::error::BudgetExhausted;

/// A black-box objective; higher is better
pub trait Objective {
    /// Fitness of a genotype
    fn evaluate(&self, values: &[f64]) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64,
{
    fn evaluate(&self, values: &[f64]) -> f64 {
        self(values)
    }
}

/// Budget-aware access to an objective
pub trait Evaluator {
    /// Evaluate one genotype, consuming one unit of budget
    fn evaluate(&mut self, values: &[f64]) -> Result<f64, BudgetExhausted>;

    /// Evaluations left
    fn remaining(&self) -> usize;

    /// Evaluations used so far
    fn evaluations(&self) -> usize;

    /// Check if no evaluations are left
    fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// An objective with a fixed evaluation budget
#[derive(Clone, Debug)]
pub struct BudgetedEvaluator<O> {
    objective: O,
    budget: usize,
    used: usize,
}

impl<O: Objective> BudgetedEvaluator<O> {
    /// Wrap an objective with the given budget
    pub fn new(objective: O, budget: usize) -> Self {
        Self {
            objective,
            budget,
            used: 0,
        }
    }

    /// The configured budget
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// The wrapped objective
    pub fn objective(&self) -> &O {
        &self.objective
    }
}

impl<O: Objective> Evaluator for BudgetedEvaluator<O> {
    fn evaluate(&mut self, values: &[f64]) -> Result<f64, BudgetExhausted> {
        if self.used >= self.budget {
            return Err(BudgetExhausted {
                budget: self.budget,
            });
        }
        self.used += 1;
        Ok(self.objective.evaluate(values))
    }

    fn remaining(&self) -> usize {
        self.budget - self.used
    }

    fn evaluations(&self) -> usize {
        self.used
    }
}
