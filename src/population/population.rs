//! Population management
//!
//! A [`Population`] owns its individuals and runs the generation cycle:
//! parent selection, recombination, mutation, offspring evaluation, and survivor
//! selection. Each phase is public so drivers and tests can run them one at a time;
//! [`Population::step`] runs them all in order.

use std::mem;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::algorithms::island::ExportPolicy;
use crate::config::EngineConfig;
use crate::diagnostics::GenerationStats;
use crate::error::{EvoResult, EvolutionError, Progress};
use crate::fitness::traits::Evaluator;
use crate::operators::selection::{fitness_values, shared_fitness};
use crate::operators::survivor::SurvivorSelection;
use crate::population::individual::Individual;

/// A fixed-size population with its mating pool and offspring buffers
#[derive(Clone, Debug)]
pub struct Population {
    config: Arc<EngineConfig>,
    size: usize,
    offspring_size: usize,
    individuals: Vec<Individual>,
    mating_pool: Vec<Individual>,
    offspring: Vec<Individual>,
    generation: usize,
    evaluations: usize,
    best: Option<Individual>,
}

impl Population {
    /// Create a random population of `config.population_size` individuals
    pub fn new<R: Rng>(config: Arc<EngineConfig>, rng: &mut R) -> EvoResult<Self> {
        let size = config.population_size;
        Self::with_size(config, size, rng)
    }

    /// Create a random population of the given size
    ///
    /// Used by the island model, where each island holds a share of the total.
    pub fn with_size<R: Rng>(
        config: Arc<EngineConfig>,
        size: usize,
        rng: &mut R,
    ) -> EvoResult<Self> {
        let individuals = (0..size).map(|_| Individual::random(&config, rng)).collect();
        Self::from_individuals(config, individuals)
    }

    /// Wrap existing individuals; their count becomes the population size
    pub fn from_individuals(
        config: Arc<EngineConfig>,
        individuals: Vec<Individual>,
    ) -> EvoResult<Self> {
        let size = individuals.len();
        let offspring_size = config.offspring_size_for(size);
        check_sizes(&config, size, offspring_size)?;
        if let Some(bad) = individuals.iter().find(|i| i.dimension() != config.dimension) {
            return Err(EvolutionError::DimensionMismatch {
                expected: config.dimension,
                actual: bad.dimension(),
            });
        }

        let best = individuals
            .iter()
            .filter(|i| i.is_evaluated())
            .fold(None, |best: Option<&Individual>, i| match best {
                Some(b) if !i.is_better_than(b) => Some(b),
                _ => Some(i),
            })
            .cloned();

        Ok(Self {
            config,
            size,
            offspring_size,
            individuals,
            mating_pool: Vec::with_capacity(offspring_size),
            offspring: Vec::with_capacity(offspring_size),
            generation: 0,
            evaluations: 0,
            best,
        })
    }

    /// Evaluate every individual that has no fitness yet
    ///
    /// Returns [`Progress::Exhausted`] if the budget runs out first; the remaining
    /// individuals stay unevaluated.
    pub fn evaluate_initial<E: Evaluator>(&mut self, evaluator: &mut E) -> EvoResult<Progress> {
        for index in 0..self.individuals.len() {
            if self.individuals[index].is_evaluated() {
                continue;
            }
            match evaluator.evaluate(self.individuals[index].values()) {
                Ok(fitness) => {
                    self.individuals[index].set_fitness(fitness);
                    self.evaluations += 1;
                    record_best(&mut self.best, &self.individuals[index]);
                }
                Err(exhausted) => {
                    warn!(%exhausted, evaluated = index, "budget ran out during initial evaluation");
                    return Ok(Progress::Exhausted);
                }
            }
        }
        Ok(Progress::Running)
    }

    /// Run one full generation
    pub fn step<E: Evaluator, R: Rng>(
        &mut self,
        evaluator: &mut E,
        rng: &mut R,
    ) -> EvoResult<Progress> {
        if evaluator.is_exhausted() {
            return Ok(Progress::Exhausted);
        }
        self.select_parents(rng)?;
        self.recombine(rng)?;
        self.mutate(rng)?;
        if self.evaluate_offspring(evaluator)?.is_exhausted() {
            return Ok(Progress::Exhausted);
        }
        self.select_survivors(rng)?;
        Ok(Progress::Running)
    }

    /// Fill the mating pool with `offspring_size` parents
    ///
    /// With deterministic crowding the pool is the shuffled population, cycled as often
    /// as needed. Otherwise the configured strategy picks parents, working on shared
    /// fitness when fitness sharing is on.
    ///
    /// Fitness sharing has no effect in crowding mode, since no parent selection happens.
    pub fn select_parents<R: Rng>(&mut self, rng: &mut R) -> EvoResult<()> {
        if self.individuals.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        self.mating_pool.clear();

        if self.config.deterministic_crowding {
            let mut order: Vec<usize> = (0..self.individuals.len()).collect();
            order.shuffle(rng);
            self.mating_pool.extend(
                order
                    .iter()
                    .cycle()
                    .take(self.offspring_size)
                    .map(|&i| self.individuals[i].clone()),
            );
            return Ok(());
        }

        let fitness = match &self.config.fitness_sharing {
            Some(sharing) => shared_fitness(&self.individuals, sharing.sigma_share)?,
            None => fitness_values(&self.individuals)?,
        };
        let draw = self
            .config
            .parent_selection
            .select(&fitness, self.offspring_size, rng)?;

        if let Some(probabilities) = draw.probabilities {
            for (individual, p) in self.individuals.iter_mut().zip(probabilities) {
                individual.selection_probability = p;
            }
        }
        self.mating_pool
            .extend(draw.parents.iter().map(|&i| self.individuals[i].clone()));
        trace!(pool = self.mating_pool.len(), "parents selected");
        Ok(())
    }

    /// Consume the mating pool in pairs, producing one offspring per parent
    ///
    /// An odd pool pairs its last parent with a random earlier one and keeps only the
    /// first child. Offspring start with fresh strategy parameters.
    pub fn recombine<R: Rng>(&mut self, rng: &mut R) -> EvoResult<()> {
        let mut pool = mem::take(&mut self.mating_pool);
        pool.shuffle(rng);
        self.offspring.clear();

        let bounds = &self.config.bounds;
        let recombination = self.config.recombination;
        for pair in pool.chunks(2) {
            match pair {
                [a, b] => {
                    let (c1, c2) = recombination.recombine(a.values(), b.values(), bounds, rng)?;
                    self.offspring.push(Individual::from_values(&c1, &self.config));
                    self.offspring.push(Individual::from_values(&c2, &self.config));
                }
                [last] => {
                    let mate = &pool[rng.gen_range(0..pool.len() - 1)];
                    let (c1, _) =
                        recombination.recombine(last.values(), mate.values(), bounds, rng)?;
                    self.offspring.push(Individual::from_values(&c1, &self.config));
                }
                _ => {}
            }
        }
        trace!(offspring = self.offspring.len(), "offspring recombined");
        Ok(())
    }

    /// Mutate every offspring in place
    pub fn mutate<R: Rng>(&mut self, rng: &mut R) -> EvoResult<()> {
        for child in &mut self.offspring {
            child.mutate(&self.config, rng)?;
        }
        Ok(())
    }

    /// Evaluate the offspring buffer
    ///
    /// If the budget runs out part-way, evaluated offspring still count toward the
    /// best-ever individual, then both buffers are cleared and the population keeps its
    /// last fully evaluated state.
    pub fn evaluate_offspring<E: Evaluator>(&mut self, evaluator: &mut E) -> EvoResult<Progress> {
        for index in 0..self.offspring.len() {
            match evaluator.evaluate(self.offspring[index].values()) {
                Ok(fitness) => {
                    self.offspring[index].set_fitness(fitness);
                    self.evaluations += 1;
                    record_best(&mut self.best, &self.offspring[index]);
                }
                Err(exhausted) => {
                    warn!(
                        %exhausted,
                        generation = self.generation,
                        evaluated = index,
                        pending = self.offspring.len() - index,
                        "budget ran out mid-generation, keeping current population"
                    );
                    self.offspring.clear();
                    self.mating_pool.clear();
                    return Ok(Progress::Exhausted);
                }
            }
        }
        Ok(Progress::Running)
    }

    /// Replace the population by the survivors of parents and offspring
    pub fn select_survivors<R: Rng>(&mut self, rng: &mut R) -> EvoResult<()> {
        let parents = mem::take(&mut self.individuals);
        let offspring = mem::take(&mut self.offspring);
        self.individuals = self
            .config
            .survivor_selection
            .select(parents, offspring, self.size, rng)?;
        self.generation += 1;

        if tracing::enabled!(tracing::Level::DEBUG) {
            let stats = self.stats();
            debug!(
                generation = stats.generation,
                evaluations = stats.evaluations,
                best = stats.best_fitness,
                mean = stats.mean_fitness,
                "generation complete"
            );
        }
        Ok(())
    }

    /// Stage `count` individuals for export and prune `count` locally
    pub fn export<R: Rng>(
        &mut self,
        count: usize,
        policy: ExportPolicy,
        rng: &mut R,
    ) -> EvoResult<Vec<Individual>> {
        policy.export(&mut self.individuals, count, rng)
    }

    /// Take in migrants
    pub fn import(&mut self, migrants: Vec<Individual>) {
        for migrant in &migrants {
            record_best(&mut self.best, migrant);
        }
        self.individuals.extend(migrants);
    }

    /// The shared configuration
    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    /// Target population size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Offspring produced per generation
    pub fn offspring_size(&self) -> usize {
        self.offspring_size
    }

    /// Current number of individuals (differs from `size` only mid-migration)
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if the population holds no individuals
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Current individuals
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Parents selected for the pending recombination
    pub fn mating_pool(&self) -> &[Individual] {
        &self.mating_pool
    }

    /// Offspring of the generation in progress
    pub fn offspring(&self) -> &[Individual] {
        &self.offspring
    }

    /// Completed generations
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Evaluations charged by this population
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Best individual ever evaluated here or imported
    pub fn best(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    /// Summary statistics of the current individuals
    pub fn stats(&self) -> GenerationStats {
        GenerationStats::from_individuals(self.generation, self.evaluations, &self.individuals)
    }
}

fn check_sizes(config: &EngineConfig, size: usize, offspring_size: usize) -> EvoResult<()> {
    if size < 2 {
        return Err(EvolutionError::Configuration(format!(
            "population size must be at least 2, got {}",
            size
        )));
    }
    if offspring_size < 2 {
        return Err(EvolutionError::Configuration(format!(
            "offspring size must be at least 2, got {}",
            offspring_size
        )));
    }
    if matches!(config.survivor_selection, SurvivorSelection::Generational)
        && offspring_size < size
    {
        return Err(EvolutionError::Configuration(format!(
            "generational survivor selection needs at least {} offspring, got {}",
            size, offspring_size
        )));
    }
    Ok(())
}

fn record_best(best: &mut Option<Individual>, candidate: &Individual) {
    if !candidate.is_evaluated() {
        return;
    }
    let improved = match best {
        Some(current) => candidate.is_better_than(current),
        None => true,
    };
    if improved {
        *best = Some(candidate.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::benchmarks::Sphere;
    use crate::fitness::traits::BudgetedEvaluator;
    use crate::genome::bounds::Bounds;
    use crate::hyperparameter::self_adaptive::StrategyParams;
    use crate::operators::crossover::Recombination;
    use crate::operators::mutation::MutationStrategy;
    use crate::operators::selection::ParentSelection;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::StandardNormal;

    fn config(builder: crate::config::EngineConfigBuilder) -> Arc<EngineConfig> {
        Arc::new(builder.build().unwrap())
    }

    fn small() -> Arc<EngineConfig> {
        config(
            EngineConfig::builder()
                .dimension(3)
                .population_size(10)
                .step_size(0.5),
        )
    }

    #[test]
    fn test_new_population_is_random_and_unevaluated() {
        let mut rng = StdRng::seed_from_u64(42);
        let pop = Population::new(small(), &mut rng).unwrap();
        assert_eq!(pop.len(), 10);
        assert_eq!(pop.offspring_size(), 10);
        assert!(pop.individuals().iter().all(|i| !i.is_evaluated()));
        assert!(pop.best().is_none());
    }

    #[test]
    fn test_evaluate_initial_tracks_best() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut pop = Population::new(small(), &mut rng).unwrap();
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(3), 100);

        assert_eq!(pop.evaluate_initial(&mut evaluator).unwrap(), Progress::Running);
        assert_eq!(pop.evaluations(), 10);
        let best = pop.best().unwrap().fitness().unwrap();
        let max = pop
            .individuals()
            .iter()
            .map(|i| i.fitness().unwrap())
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best, max);
    }

    #[test]
    fn test_step_keeps_size_and_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for mutation in [
            MutationStrategy::Uniform,
            MutationStrategy::NonUniform,
            MutationStrategy::UncorrelatedOneStep,
            MutationStrategy::UncorrelatedNStep,
            MutationStrategy::Correlated,
        ] {
            let cfg = config(
                EngineConfig::builder()
                    .dimension(3)
                    .bounds(Bounds::new(-1.0, 1.0))
                    .population_size(8)
                    .offspring_ratio(1.5)
                    .step_size(0.4)
                    .mutation(mutation),
            );
            let mut pop = Population::new(cfg.clone(), &mut rng).unwrap();
            let mut evaluator = BudgetedEvaluator::new(Sphere::new(3), 10_000);
            pop.evaluate_initial(&mut evaluator).unwrap();
            for _ in 0..20 {
                assert_eq!(pop.step(&mut evaluator, &mut rng).unwrap(), Progress::Running);
                assert_eq!(pop.len(), 8);
                for ind in pop.individuals() {
                    assert!(cfg.bounds.contains_all(ind.values()));
                    assert!(ind.is_evaluated());
                }
            }
            assert_eq!(pop.generation(), 20);
            assert_eq!(pop.evaluations(), 8 + 20 * 12);
        }
    }

    #[test]
    fn test_odd_offspring_size() {
        let mut rng = StdRng::seed_from_u64(3);
        let cfg = config(
            EngineConfig::builder()
                .dimension(2)
                .population_size(5)
                .offspring_ratio(1.0),
        );
        let mut pop = Population::new(cfg, &mut rng).unwrap();
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(2), 1_000);
        pop.evaluate_initial(&mut evaluator).unwrap();

        pop.select_parents(&mut rng).unwrap();
        assert_eq!(pop.mating_pool().len(), 5);
        pop.recombine(&mut rng).unwrap();
        assert_eq!(pop.offspring().len(), 5);
        assert!(pop.mating_pool().is_empty());
    }

    #[test]
    fn test_probabilities_recorded() {
        let mut rng = StdRng::seed_from_u64(3);
        let cfg = config(
            EngineConfig::builder()
                .dimension(2)
                .population_size(6)
                .parent_selection(ParentSelection::LinearRank { pressure: 1.8 }),
        );
        let mut pop = Population::new(cfg, &mut rng).unwrap();
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(2), 1_000);
        pop.evaluate_initial(&mut evaluator).unwrap();
        pop.select_parents(&mut rng).unwrap();

        let total: f64 = pop
            .individuals()
            .iter()
            .map(|i| i.selection_probability())
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_select_parents_requires_evaluation() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pop = Population::new(small(), &mut rng).unwrap();
        assert!(matches!(
            pop.select_parents(&mut rng),
            Err(EvolutionError::UnevaluatedIndividual { index: 0 })
        ));
    }

    #[test]
    fn test_fitness_sharing_and_crowding_run() {
        let mut rng = StdRng::seed_from_u64(11);
        for crowding in [false, true] {
            let cfg = config(
                EngineConfig::builder()
                    .dimension(2)
                    .population_size(12)
                    .fitness_sharing(1.0)
                    .deterministic_crowding(crowding)
                    .parent_selection(ParentSelection::ExponentialRank),
            );
            let mut pop = Population::new(cfg, &mut rng).unwrap();
            let mut evaluator = BudgetedEvaluator::new(Sphere::new(2), 1_000);
            pop.evaluate_initial(&mut evaluator).unwrap();
            for _ in 0..5 {
                pop.step(&mut evaluator, &mut rng).unwrap();
            }
            assert_eq!(pop.len(), 12);
        }
    }

    #[test]
    fn test_sharing_favours_isolated_negative_fitness() {
        let mut rng = StdRng::seed_from_u64(12);
        let cfg = config(
            EngineConfig::builder()
                .dimension(2)
                .population_size(3)
                .fitness_sharing(2.0)
                .parent_selection(ParentSelection::LinearRank { pressure: 2.0 }),
        );
        let individuals = vec![
            Individual::with_fitness(vec![0.0, 0.0], -4.0),
            Individual::with_fitness(vec![0.0, 1.0], -4.0),
            Individual::with_fitness(vec![4.0, 4.0], -4.0),
        ];
        let mut pop = Population::from_individuals(cfg, individuals).unwrap();
        pop.select_parents(&mut rng).unwrap();

        let probs: Vec<f64> = pop
            .individuals()
            .iter()
            .map(|i| i.selection_probability())
            .collect();
        assert!(probs[2] > probs[0]);
        assert!(probs[2] > probs[1]);
        // stored fitness is untouched
        assert!(pop.individuals().iter().all(|i| i.fitness() == Some(-4.0)));
    }

    #[test]
    fn test_budget_exhaustion_mid_generation() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pop = Population::new(small(), &mut rng).unwrap();
        // 10 initial + 4 of the 10 offspring
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(3), 14);
        pop.evaluate_initial(&mut evaluator).unwrap();
        let before: Vec<Individual> = pop.individuals().to_vec();

        assert_eq!(
            pop.step(&mut evaluator, &mut rng).unwrap(),
            Progress::Exhausted
        );
        assert_eq!(pop.individuals(), before.as_slice());
        assert!(pop.offspring().is_empty());
        assert!(pop.mating_pool().is_empty());
        assert_eq!(pop.generation(), 0);
        assert_eq!(pop.evaluations(), 14);

        // pre-check: no further work once the budget is gone
        assert_eq!(
            pop.step(&mut evaluator, &mut rng).unwrap(),
            Progress::Exhausted
        );
        assert_eq!(pop.evaluations(), 14);
    }

    #[test]
    fn test_exhaustion_during_initial_evaluation() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pop = Population::new(small(), &mut rng).unwrap();
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(3), 4);
        assert_eq!(
            pop.evaluate_initial(&mut evaluator).unwrap(),
            Progress::Exhausted
        );
        assert_eq!(pop.individuals().iter().filter(|i| i.is_evaluated()).count(), 4);
        assert!(pop.best().is_some());
    }

    #[test]
    fn test_best_ever_survives_generational_loss() {
        let mut rng = StdRng::seed_from_u64(8);
        let cfg = config(
            EngineConfig::builder()
                .dimension(2)
                .population_size(4)
                .survivor_selection(SurvivorSelection::Generational),
        );
        let individuals = vec![
            Individual::with_fitness(vec![0.0, 0.0], 100.0),
            Individual::with_fitness(vec![1.0, 1.0], 1.0),
            Individual::with_fitness(vec![2.0, 2.0], 2.0),
            Individual::with_fitness(vec![3.0, 3.0], 3.0),
        ];
        let mut pop = Population::from_individuals(cfg, individuals).unwrap();
        let mut evaluator = BudgetedEvaluator::new(|_: &[f64]| -1.0, 100);
        pop.step(&mut evaluator, &mut rng).unwrap();

        assert!(pop.individuals().iter().all(|i| i.fitness() == Some(-1.0)));
        assert_eq!(pop.best().unwrap().fitness(), Some(100.0));
    }

    #[test]
    fn test_one_step_scenario_replays_log_normal_update() {
        let cfg = config(
            EngineConfig::builder()
                .dimension(2)
                .bounds(Bounds::new(-5.0, 5.0))
                .population_size(4)
                .offspring_ratio(1.0)
                .mutation(MutationStrategy::UncorrelatedOneStep)
                .recombination(Recombination::WholeArithmetic)
                .survivor_selection(SurvivorSelection::Generational),
        );
        let rates = cfg.learning_rates();
        assert!((rates.tau - 1.0 / 2f64.sqrt()).abs() < 1e-12);

        let mut rng = StdRng::seed_from_u64(2024);
        let mut pop = Population::new(cfg.clone(), &mut rng).unwrap();
        let mut evaluator = BudgetedEvaluator::new(Sphere::new(2), 100);
        pop.evaluate_initial(&mut evaluator).unwrap();
        pop.select_parents(&mut rng).unwrap();
        pop.recombine(&mut rng).unwrap();

        let before: Vec<Vec<f64>> = pop.offspring().iter().map(|c| c.values().to_vec()).collect();
        let mut replay = rng.clone();
        pop.mutate(&mut rng).unwrap();

        for (child, start) in pop.offspring().iter().zip(before) {
            let n: f64 = replay.sample(StandardNormal);
            let sigma = (cfg.step_size * (rates.tau * n).exp()).max(rates.epsilon);
            assert_eq!(child.strategy(), &StrategyParams::OneStep(sigma));
            for (x, mutated) in start.iter().zip(child.values()) {
                let z: f64 = replay.sample(StandardNormal);
                assert!((cfg.bounds.clamp(x + sigma * z) - mutated).abs() < 1e-12);
            }
            assert!(cfg.bounds.contains_all(child.values()));
        }

        pop.evaluate_offspring(&mut evaluator).unwrap();
        pop.select_survivors(&mut rng).unwrap();
        assert_eq!(pop.len(), 4);
        assert_eq!(pop.generation(), 1);
        assert!(pop
            .individuals()
            .iter()
            .all(|i| cfg.bounds.contains_all(i.values())));
    }

    #[test]
    fn test_export_import_restores_size() {
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = config(EngineConfig::builder().dimension(1).population_size(5));
        let individuals = (0..5)
            .map(|i| Individual::with_fitness(vec![i as f64], i as f64))
            .collect();
        let mut pop = Population::from_individuals(cfg, individuals).unwrap();

        let batch = pop.export(2, ExportPolicy::BestWorst, &mut rng).unwrap();
        assert_eq!(pop.len(), 3);
        let exported: Vec<f64> = batch.iter().map(|i| i.fitness().unwrap()).collect();
        assert_eq!(exported, vec![4.0, 3.0]);

        pop.import(batch);
        assert_eq!(pop.len(), 5);
    }

    #[test]
    fn test_from_individuals_rejects_wrong_dimension() {
        let cfg = config(EngineConfig::builder().dimension(3).population_size(2));
        let individuals = vec![
            Individual::with_fitness(vec![0.0; 3], 0.0),
            Individual::with_fitness(vec![0.0; 2], 0.0),
        ];
        assert!(matches!(
            Population::from_individuals(cfg, individuals),
            Err(EvolutionError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
