//! Run driver
//!
//! [`Optimizer`] builds either a single population or an island model from the
//! configuration and runs generations until the evaluation budget is spent.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::algorithms::island::IslandModel;
use crate::config::EngineConfig;
use crate::diagnostics::{EvolutionStats, GenerationStats};
use crate::error::{EvoResult, Progress};
use crate::fitness::traits::Evaluator;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Outcome of a complete run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Best individual ever evaluated (`None` only with a zero budget)
    pub best: Option<Individual>,
    /// Completed generations
    pub generations: usize,
    /// Evaluations charged
    pub evaluations: usize,
    /// Per-generation history, initial population first
    pub stats: EvolutionStats,
}

impl RunSummary {
    /// Fitness of the best individual
    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().and_then(Individual::fitness)
    }
}

/// A single population or an island model, chosen by the configuration
#[derive(Clone, Debug)]
pub enum Optimizer {
    Single(Population),
    Islands(IslandModel),
}

impl Optimizer {
    /// Validate the configuration and create the random initial state
    pub fn new<R: Rng>(config: EngineConfig, rng: &mut R) -> EvoResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        if config.islands.is_some() {
            Ok(Self::Islands(IslandModel::new(config, rng)?))
        } else {
            Ok(Self::Single(Population::new(config, rng)?))
        }
    }

    /// Evaluate the initial individuals
    pub fn evaluate_initial<E: Evaluator>(&mut self, evaluator: &mut E) -> EvoResult<Progress> {
        match self {
            Self::Single(population) => population.evaluate_initial(evaluator),
            Self::Islands(model) => model.evaluate_initial(evaluator),
        }
    }

    /// Run one generation
    pub fn step<E: Evaluator, R: Rng>(
        &mut self,
        evaluator: &mut E,
        rng: &mut R,
    ) -> EvoResult<Progress> {
        match self {
            Self::Single(population) => population.step(evaluator, rng),
            Self::Islands(model) => model.step(evaluator, rng),
        }
    }

    /// Evaluate the initial state, then step until the budget runs out
    ///
    /// The evaluator's budget is the only stop condition.
    pub fn run<E: Evaluator, R: Rng>(
        &mut self,
        evaluator: &mut E,
        rng: &mut R,
    ) -> EvoResult<RunSummary> {
        let start = Instant::now();
        info!(
            islands = matches!(self, Self::Islands(_)),
            budget = evaluator.remaining(),
            "starting run"
        );

        let mut stats = EvolutionStats::new();
        let mut progress = self.evaluate_initial(evaluator)?;
        stats.record(self.stats());

        while !progress.is_exhausted() {
            progress = self.step(evaluator, rng)?;
            if !progress.is_exhausted() {
                stats.record(self.stats());
            }
        }
        stats.set_runtime(start.elapsed());

        let summary = RunSummary {
            best: self.best().cloned(),
            generations: self.generation(),
            evaluations: self.evaluations(),
            stats,
        };
        info!(
            generations = summary.generations,
            evaluations = summary.evaluations,
            best = summary.best_fitness(),
            runtime_ms = summary.stats.total_runtime_ms,
            "run finished"
        );
        Ok(summary)
    }

    /// Best individual ever evaluated
    pub fn best(&self) -> Option<&Individual> {
        match self {
            Self::Single(population) => population.best(),
            Self::Islands(model) => model.best(),
        }
    }

    /// Completed generations
    pub fn generation(&self) -> usize {
        match self {
            Self::Single(population) => population.generation(),
            Self::Islands(model) => model.generation(),
        }
    }

    /// Evaluations charged
    pub fn evaluations(&self) -> usize {
        match self {
            Self::Single(population) => population.evaluations(),
            Self::Islands(model) => model.evaluations(),
        }
    }

    /// Statistics of the current state
    pub fn stats(&self) -> GenerationStats {
        match self {
            Self::Single(population) => population.stats(),
            Self::Islands(model) => model.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::island::{ExportPolicy, Topology};
    use crate::config::IslandConfig;
    use crate::fitness::benchmarks::{Rastrigin, Sphere};
    use crate::fitness::traits::BudgetedEvaluator;
    use crate::operators::mutation::MutationStrategy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_run_spends_budget_exactly() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = EngineConfig::builder()
            .dimension(3)
            .population_size(10)
            .build()
            .unwrap();
        let mut optimizer = Optimizer::new(config, &mut rng).unwrap();
        // 10 initial + 4 full generations + 5 stray evaluations
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(3), 55);
        let summary = optimizer.run(&mut evaluator, &mut rng).unwrap();

        assert_eq!(summary.evaluations, 55);
        assert_eq!(summary.generations, 4);
        assert_eq!(summary.stats.num_generations(), 5);
        assert!(summary.best_fitness().unwrap() <= 0.0);
    }

    #[test]
    fn test_run_improves_sphere() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = EngineConfig::builder()
            .dimension(5)
            .population_size(20)
            .step_size(0.5)
            .mutation(MutationStrategy::UncorrelatedNStep)
            .build()
            .unwrap();
        let mut optimizer = Optimizer::new(config, &mut rng).unwrap();
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(5), 4_000);
        let summary = optimizer.run(&mut evaluator, &mut rng).unwrap();

        let history = summary.stats.best_fitness_history();
        assert!(history.last().unwrap() > history.first().unwrap());
        assert!(summary.best_fitness().unwrap() > -0.5);
    }

    #[test]
    fn test_island_run() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = EngineConfig::builder()
            .dimension(2)
            .population_size(40)
            .islands(IslandConfig {
                count: 4,
                epoch: 5,
                exchanged: 4,
                topology: Topology::Torus { rows: 2, cols: 2 },
                policy: ExportPolicy::RandomRandom,
            })
            .build()
            .unwrap();
        let mut optimizer = Optimizer::new(config, &mut rng).unwrap();
        assert!(matches!(optimizer, Optimizer::Islands(_)));

        let mut evaluator = BudgetedEvaluator::new(Rastrigin::new(2), 2_000);
        let summary = optimizer.run(&mut evaluator, &mut rng).unwrap();
        assert_eq!(summary.evaluations, 2_000);
        assert!(summary.generations >= 40);
        if let Optimizer::Islands(model) = &optimizer {
            assert_eq!(model.total_size(), 40);
            assert!(model.migrations() >= 8);
        }
    }

    #[test]
    fn test_zero_budget() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut optimizer = Optimizer::new(EngineConfig::default(), &mut rng).unwrap();
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(10), 0);
        let summary = optimizer.run(&mut evaluator, &mut rng).unwrap();
        assert!(summary.best.is_none());
        assert_eq!(summary.generations, 0);
        assert_eq!(summary.evaluations, 0);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = EngineConfig {
            population_size: 1,
            ..EngineConfig::default()
        };
        assert!(Optimizer::new(config, &mut rng).is_err());
    }
}
