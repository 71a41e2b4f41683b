//! Engine configuration
//!
//! A run is fully described by one immutable [`EngineConfig`]. Populations and island
//! models hold it behind an `Arc` and hand it to every operator, so several runs with
//! different settings never share state.

use serde::{Deserialize, Serialize};

use crate::algorithms::island::{ExportPolicy, Topology};
use crate::error::{EvoResult, EvolutionError};
use crate::genome::bounds::Bounds;
use crate::hyperparameter::self_adaptive::LearningRates;
use crate::operators::crossover::Recombination;
use crate::operators::mutation::MutationStrategy;
use crate::operators::selection::ParentSelection;
use crate::operators::survivor::SurvivorSelection;

/// Fitness sharing parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitnessSharing {
    /// Niche radius; individuals further apart do not share fitness
    pub sigma_share: f64,
}

impl Default for FitnessSharing {
    fn default() -> Self {
        Self { sigma_share: 5.0 }
    }
}

/// Island model parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IslandConfig {
    /// Number of islands; the population is split evenly between them
    pub count: usize,
    /// Generations between migrations (0 disables automatic migration)
    pub epoch: usize,
    /// Individuals each island exports per migration
    pub exchanged: usize,
    /// Which island sends to which
    pub topology: Topology,
    /// Which individuals leave and which are dropped
    pub policy: ExportPolicy,
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self {
            count: 10,
            epoch: 50,
            exchanged: 8,
            topology: Topology::Torus { rows: 2, cols: 5 },
            policy: ExportPolicy::BestWorst,
        }
    }
}

/// Complete configuration of an optimization run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Genotype dimension `D`
    pub dimension: usize,
    /// Coordinate bounds shared by every axis
    pub bounds: Bounds,
    /// Total population size (split across islands when the island model is on)
    pub population_size: usize,
    /// Offspring produced per generation, relative to the population size
    pub offspring_ratio: f64,
    /// Fixed step size for non-uniform mutation and initial value of every adaptive step size
    pub step_size: f64,
    /// Per-coordinate replacement probability of uniform mutation
    pub mutation_rate: f64,
    /// Mutation operator
    pub mutation: MutationStrategy,
    /// Self-adaptation constants; derived from the dimension when absent
    pub learning_rates: Option<LearningRates>,
    /// Parent selection operator
    pub parent_selection: ParentSelection,
    /// Recombination operator
    pub recombination: Recombination,
    /// Survivor selection operator
    pub survivor_selection: SurvivorSelection,
    /// Fitness sharing applied before parent selection
    pub fitness_sharing: Option<FitnessSharing>,
    /// Pair shuffled population members instead of sampling parents
    pub deterministic_crowding: bool,
    /// Island model; `None` runs a single population
    pub islands: Option<IslandConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: 10,
            bounds: Bounds::symmetric(5.0),
            population_size: 100,
            offspring_ratio: 1.0,
            step_size: 0.05,
            mutation_rate: 0.1,
            mutation: MutationStrategy::UncorrelatedNStep,
            learning_rates: None,
            parent_selection: ParentSelection::Tournament { size: 2 },
            recombination: Recombination::WholeArithmetic,
            survivor_selection: SurvivorSelection::MuPlusLambda,
            fitness_sharing: None,
            deterministic_crowding: false,
            islands: None,
        }
    }
}

impl EngineConfig {
    /// Create a builder starting from the defaults
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing fields take their default; unknown fields and unknown strategy names
    /// are rejected.
    pub fn from_json(json: &str) -> EvoResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EvolutionError::Configuration(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> EvoResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EvolutionError::Configuration(format!("cannot serialize config: {}", e)))
    }

    /// Effective self-adaptation constants
    pub fn learning_rates(&self) -> LearningRates {
        self.learning_rates
            .unwrap_or_else(|| LearningRates::for_mutation(self.mutation, self.dimension))
    }

    /// Number of individuals in each population of the run
    pub fn island_population_size(&self) -> usize {
        match &self.islands {
            Some(islands) if islands.count > 0 => self.population_size / islands.count,
            _ => self.population_size,
        }
    }

    /// Offspring produced per generation by a population of the given size
    pub fn offspring_size_for(&self, population_size: usize) -> usize {
        (population_size as f64 * self.offspring_ratio).round() as usize
    }

    /// Check every parameter; called by all construction paths
    pub fn validate(&self) -> EvoResult<()> {
        let fail = |msg: String| Err(EvolutionError::Configuration(msg));

        if self.dimension == 0 {
            return fail("dimension must be at least 1".into());
        }
        self.bounds.validate()?;
        if self.population_size < 2 {
            return fail(format!(
                "population size must be at least 2, got {}",
                self.population_size
            ));
        }
        if !(self.offspring_ratio.is_finite() && self.offspring_ratio > 0.0) {
            return fail(format!(
                "offspring ratio must be positive, got {}",
                self.offspring_ratio
            ));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return fail(format!("step size must be positive, got {}", self.step_size));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return fail(format!(
                "mutation rate must be in [0, 1], got {}",
                self.mutation_rate
            ));
        }
        self.learning_rates().validate()?;
        if self.step_size < self.learning_rates().epsilon {
            return fail(format!(
                "step size {} is below the epsilon floor {}",
                self.step_size,
                self.learning_rates().epsilon
            ));
        }
        self.parent_selection.validate()?;
        self.recombination.validate()?;
        self.survivor_selection.validate()?;
        if let Some(sharing) = &self.fitness_sharing {
            if !(sharing.sigma_share.is_finite() && sharing.sigma_share > 0.0) {
                return fail(format!(
                    "sigma_share must be positive, got {}",
                    sharing.sigma_share
                ));
            }
        }

        let island_size = self.island_population_size();
        if let Some(islands) = &self.islands {
            self.validate_islands(islands, island_size)?;
        }

        let offspring = self.offspring_size_for(island_size);
        if offspring < 2 {
            return fail(format!(
                "offspring size must be at least 2, got {} (population {} x ratio {})",
                offspring, island_size, self.offspring_ratio
            ));
        }
        if matches!(self.survivor_selection, SurvivorSelection::Generational)
            && offspring < island_size
        {
            return fail(format!(
                "generational survivor selection needs at least {} offspring, got {}",
                island_size, offspring
            ));
        }
        Ok(())
    }

    fn validate_islands(&self, islands: &IslandConfig, island_size: usize) -> EvoResult<()> {
        let fail = |msg: String| Err(EvolutionError::Configuration(msg));

        if islands.count == 0 {
            return fail("island count must be at least 1".into());
        }
        if island_size < 2 {
            return fail(format!(
                "{} islands leave {} individuals per island, need at least 2",
                islands.count, island_size
            ));
        }
        if islands.exchanged >= island_size {
            return fail(format!(
                "cannot exchange {} individuals from islands of size {}",
                islands.exchanged, island_size
            ));
        }
        islands.topology.validate(islands.count, islands.exchanged)
    }
}

/// Builder for [`EngineConfig`]
#[derive(Clone, Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the genotype dimension
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.config.dimension = dimension;
        self
    }

    /// Set the coordinate bounds
    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.config.bounds = bounds;
        self
    }

    /// Set the total population size
    pub fn population_size(mut self, size: usize) -> Self {
        self.config.population_size = size;
        self
    }

    /// Set the offspring ratio
    pub fn offspring_ratio(mut self, ratio: f64) -> Self {
        self.config.offspring_ratio = ratio;
        self
    }

    /// Set the fixed / initial step size
    pub fn step_size(mut self, step_size: f64) -> Self {
        self.config.step_size = step_size;
        self
    }

    /// Set the uniform mutation rate
    pub fn mutation_rate(mut self, rate: f64) -> Self {
        self.config.mutation_rate = rate;
        self
    }

    /// Set the mutation operator
    pub fn mutation(mut self, mutation: MutationStrategy) -> Self {
        self.config.mutation = mutation;
        self
    }

    /// Override the self-adaptation constants
    pub fn learning_rates(mut self, rates: LearningRates) -> Self {
        self.config.learning_rates = Some(rates);
        self
    }

    /// Set the parent selection operator
    pub fn parent_selection(mut self, selection: ParentSelection) -> Self {
        self.config.parent_selection = selection;
        self
    }

    /// Set the recombination operator
    pub fn recombination(mut self, recombination: Recombination) -> Self {
        self.config.recombination = recombination;
        self
    }

    /// Set the survivor selection operator
    pub fn survivor_selection(mut self, selection: SurvivorSelection) -> Self {
        self.config.survivor_selection = selection;
        self
    }

    /// Enable fitness sharing with the given niche radius
    pub fn fitness_sharing(mut self, sigma_share: f64) -> Self {
        self.config.fitness_sharing = Some(FitnessSharing { sigma_share });
        self
    }

    /// Enable or disable deterministic crowding
    pub fn deterministic_crowding(mut self, enabled: bool) -> Self {
        self.config.deterministic_crowding = enabled;
        self
    }

    /// Enable the island model
    pub fn islands(mut self, islands: IslandConfig) -> Self {
        self.config.islands = Some(islands);
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> EvoResult<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.offspring_size_for(config.population_size), 100);
    }

    #[test]
    fn test_default_island_config_is_valid() {
        let config = EngineConfig::builder()
            .islands(IslandConfig::default())
            .build()
            .unwrap();
        assert_eq!(config.island_population_size(), 10);
    }

    #[test]
    fn test_builder_rejects_small_population() {
        let result = EngineConfig::builder().population_size(1).build();
        assert!(matches!(result, Err(EvolutionError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_generational_with_few_offspring() {
        let result = EngineConfig::builder()
            .population_size(10)
            .offspring_ratio(0.5)
            .survivor_selection(SurvivorSelection::Generational)
            .build();
        assert!(result.is_err());

        let result = EngineConfig::builder()
            .population_size(10)
            .offspring_ratio(0.5)
            .survivor_selection(SurvivorSelection::MuPlusLambda)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_ranking_pressure() {
        let result = EngineConfig::builder()
            .parent_selection(ParentSelection::LinearRank { pressure: 2.5 })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_step_size_below_epsilon() {
        let result = EngineConfig::builder()
            .step_size(0.001)
            .learning_rates(LearningRates::custom(0.3, 0.2, 0.0873, 0.01))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_torus_requires_matching_grid() {
        let islands = IslandConfig {
            count: 6,
            epoch: 10,
            exchanged: 4,
            topology: Topology::Torus { rows: 2, cols: 5 },
            policy: ExportPolicy::BestWorst,
        };
        let result = EngineConfig::builder()
            .population_size(60)
            .islands(islands)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_exchange_must_fit_island() {
        let islands = IslandConfig {
            count: 4,
            epoch: 10,
            exchanged: 5,
            topology: Topology::Ring,
            policy: ExportPolicy::BestWorst,
        };
        let result = EngineConfig::builder()
            .population_size(20)
            .islands(islands)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{
            "dimension": 2,
            "population_size": 4,
            "mutation": "uncorrelated_one_step",
            "recombination": { "kind": "blend", "alpha": 0.5 },
            "parent_selection": { "kind": "linear_rank", "pressure": 1.5 }
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.dimension, 2);
        assert_eq!(config.population_size, 4);
        assert_eq!(config.mutation, MutationStrategy::UncorrelatedOneStep);
        assert_eq!(config.bounds, Bounds::symmetric(5.0));
    }

    #[test]
    fn test_from_json_rejects_unknown_strategy() {
        let json = r#"{ "mutation": "cauchy" }"#;
        let result = EngineConfig::from_json(json);
        assert!(matches!(result, Err(EvolutionError::Configuration(_))));
    }

    #[test]
    fn test_from_json_rejects_unknown_field() {
        let json = r#"{ "populaton_size": 10 }"#;
        assert!(EngineConfig::from_json(json).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::builder()
            .fitness_sharing(4.0)
            .islands(IslandConfig::default())
            .build()
            .unwrap();
        let json = config.to_json().unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_learning_rates_derived_from_dimension() {
        let config = EngineConfig::builder()
            .dimension(4)
            .mutation(MutationStrategy::UncorrelatedOneStep)
            .build()
            .unwrap();
        assert!((config.learning_rates().tau - 0.5).abs() < 1e-12);
    }
}
