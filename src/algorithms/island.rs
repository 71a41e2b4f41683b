//! Island model
//!
//! Several populations evolve side by side and periodically exchange individuals.
//! Migration is message passing: every island first stages an immutable
//! [`ExportBatch`] and prunes itself, the topology computes the delivery routes, and
//! only then are the batches delivered. No island imports before all islands have
//! pruned.

use std::ops::Range;
use std::sync::Arc;

use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EngineConfig, IslandConfig};
use crate::diagnostics::GenerationStats;
use crate::error::{EvoResult, EvolutionError, Progress};
use crate::fitness::traits::Evaluator;
use crate::population::individual::{by_fitness, Individual};
use crate::population::population::Population;

/// Which island sends to which
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// Island i sends its whole batch to island i + 1 (mod N)
    #[default]
    Ring,
    /// `rows × cols` grid with wrapping edges; a quarter of each batch goes to each of
    /// the four neighbours
    Torus { rows: usize, cols: usize },
    /// A fresh random permutation each round; island i sends to island π(i)
    Random,
}

/// One delivery: part of the batch exported by `from` goes to `to`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Exporting island
    pub from: usize,
    /// Importing island
    pub to: usize,
    /// Slice of the exporter's batch
    pub range: Range<usize>,
}

impl Topology {
    pub(crate) fn validate(&self, count: usize, exchanged: usize) -> EvoResult<()> {
        if let Self::Torus { rows, cols } = self {
            if rows * cols != count {
                return Err(EvolutionError::Configuration(format!(
                    "torus of {}x{} does not match {} islands",
                    rows, cols, count
                )));
            }
            if exchanged % 4 != 0 {
                return Err(EvolutionError::Configuration(format!(
                    "torus migration splits batches in four, {} is not divisible by 4",
                    exchanged
                )));
            }
        }
        Ok(())
    }

    /// Delivery routes for one migration round over `count` islands
    ///
    /// Every batch of `exchanged` individuals is delivered exactly once in total, and
    /// every island receives exactly `exchanged` individuals.
    pub fn plan<R: Rng>(&self, count: usize, exchanged: usize, rng: &mut R) -> Vec<Route> {
        let whole = |from: usize, to: usize| Route {
            from,
            to,
            range: 0..exchanged,
        };
        match self {
            Self::Ring => (0..count).map(|i| whole(i, (i + 1) % count)).collect(),
            Self::Random => {
                let mut slots: Vec<usize> = (0..count).collect();
                slots.shuffle(rng);
                slots
                    .into_iter()
                    .enumerate()
                    .map(|(from, to)| whole(from, to))
                    .collect()
            }
            Self::Torus { rows, cols } => torus_routes(*rows, *cols, exchanged),
        }
    }
}

// Quarter order: north, south, east, west.
fn torus_routes(rows: usize, cols: usize, exchanged: usize) -> Vec<Route> {
    let quarter = exchanged / 4;
    let mut routes = Vec::with_capacity(rows * cols * 4);
    for r in 0..rows {
        for c in 0..cols {
            let from = r * cols + c;
            let neighbours = [
                ((r + rows - 1) % rows) * cols + c,
                ((r + 1) % rows) * cols + c,
                r * cols + (c + 1) % cols,
                r * cols + (c + cols - 1) % cols,
            ];
            for (q, to) in neighbours.into_iter().enumerate() {
                routes.push(Route {
                    from,
                    to,
                    range: q * quarter..(q + 1) * quarter,
                });
            }
        }
    }
    routes
}

/// Which individuals leave an island and which are dropped
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPolicy {
    /// Export copies of the best n, then drop the worst n
    #[default]
    BestWorst,
    /// Export copies of n distinct random individuals, then drop n distinct random ones
    RandomRandom,
}

impl ExportPolicy {
    /// Stage `count` individuals for export and remove `count` from `individuals`
    pub fn export<R: Rng>(
        &self,
        individuals: &mut Vec<Individual>,
        count: usize,
        rng: &mut R,
    ) -> EvoResult<Vec<Individual>> {
        if count > individuals.len() {
            return Err(EvolutionError::Configuration(format!(
                "cannot export {} of {} individuals",
                count,
                individuals.len()
            )));
        }

        match self {
            Self::BestWorst => {
                individuals.sort_by(|a, b| by_fitness(b, a));
                let batch = individuals[..count].to_vec();
                individuals.truncate(individuals.len() - count);
                Ok(batch)
            }
            Self::RandomRandom => {
                let batch = index::sample(rng, individuals.len(), count)
                    .into_iter()
                    .map(|i| individuals[i].clone())
                    .collect();
                let mut doomed = index::sample(rng, individuals.len(), count).into_vec();
                doomed.sort_unstable_by(|a, b| b.cmp(a));
                for i in doomed {
                    individuals.swap_remove(i);
                }
                Ok(batch)
            }
        }
    }
}

/// Individuals staged by one island for a migration round
#[derive(Clone, Debug, PartialEq)]
pub struct ExportBatch {
    origin: usize,
    individuals: Vec<Individual>,
}

impl ExportBatch {
    /// Island that exported the batch
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// The staged individuals
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Number of staged individuals
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if nothing was staged
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }
}

/// Island model over equally sized populations
#[derive(Clone, Debug)]
pub struct IslandModel {
    config: Arc<EngineConfig>,
    islands: Vec<Population>,
    generation: usize,
    migrations: usize,
}

impl IslandModel {
    /// Create `count` random islands of `population_size / count` individuals each
    pub fn new<R: Rng>(config: Arc<EngineConfig>, rng: &mut R) -> EvoResult<Self> {
        let settings = island_settings(&config)?;
        let size = config.island_population_size();
        let islands = (0..settings.count)
            .map(|_| Population::with_size(Arc::clone(&config), size, rng))
            .collect::<EvoResult<Vec<_>>>()?;
        Self::from_islands(config, islands)
    }

    /// Wrap existing populations
    pub fn from_islands(config: Arc<EngineConfig>, islands: Vec<Population>) -> EvoResult<Self> {
        let settings = island_settings(&config)?;
        if islands.len() != settings.count {
            return Err(EvolutionError::Configuration(format!(
                "expected {} islands, got {}",
                settings.count,
                islands.len()
            )));
        }
        settings.topology.validate(islands.len(), settings.exchanged)?;
        Ok(Self {
            config,
            islands,
            generation: 0,
            migrations: 0,
        })
    }

    /// Evaluate the initial individuals of every island in order
    pub fn evaluate_initial<E: Evaluator>(&mut self, evaluator: &mut E) -> EvoResult<Progress> {
        for island in &mut self.islands {
            if island.evaluate_initial(evaluator)?.is_exhausted() {
                return Ok(Progress::Exhausted);
            }
        }
        Ok(Progress::Running)
    }

    /// Step every island once, in order, then migrate if the epoch has come round
    pub fn step<E: Evaluator, R: Rng>(
        &mut self,
        evaluator: &mut E,
        rng: &mut R,
    ) -> EvoResult<Progress> {
        for island in &mut self.islands {
            if island.step(evaluator, rng)?.is_exhausted() {
                return Ok(Progress::Exhausted);
            }
        }
        self.generation += 1;
        debug!(generation = self.generation, "island generation complete");

        let epoch = island_settings(&self.config)?.epoch;
        if epoch > 0 && self.generation % epoch == 0 {
            self.migrate(rng)?;
        }
        Ok(Progress::Running)
    }

    /// Run one migration round
    ///
    /// Returns the staged batches, which the islands have already received.
    pub fn migrate<R: Rng>(&mut self, rng: &mut R) -> EvoResult<Vec<ExportBatch>> {
        let settings = island_settings(&self.config)?.clone();

        let batches = self
            .islands
            .iter_mut()
            .enumerate()
            .map(|(origin, island)| {
                island
                    .export(settings.exchanged, settings.policy, rng)
                    .map(|individuals| ExportBatch {
                        origin,
                        individuals,
                    })
            })
            .collect::<EvoResult<Vec<_>>>()?;

        let routes = settings
            .topology
            .plan(self.islands.len(), settings.exchanged, rng);

        let mut inboxes: Vec<Vec<Individual>> = vec![Vec::new(); self.islands.len()];
        for route in &routes {
            inboxes[route.to].extend_from_slice(&batches[route.from].individuals[route.range.clone()]);
        }
        for (island, migrants) in self.islands.iter_mut().zip(inboxes) {
            island.import(migrants);
        }

        self.migrations += 1;
        info!(
            generation = self.generation,
            round = self.migrations,
            exchanged = settings.exchanged,
            topology = ?settings.topology,
            "migration round complete"
        );
        Ok(batches)
    }

    /// The islands, in processing order
    pub fn islands(&self) -> &[Population] {
        &self.islands
    }

    /// Completed generations
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Completed migration rounds
    pub fn migrations(&self) -> usize {
        self.migrations
    }

    /// Individuals across all islands
    pub fn total_size(&self) -> usize {
        self.islands.iter().map(Population::len).sum()
    }

    /// Evaluations charged by all islands
    pub fn evaluations(&self) -> usize {
        self.islands.iter().map(Population::evaluations).sum()
    }

    /// Best individual ever seen on any island
    pub fn best(&self) -> Option<&Individual> {
        self.islands
            .iter()
            .filter_map(Population::best)
            .fold(None, |best: Option<&Individual>, candidate| match best {
                Some(b) if !candidate.is_better_than(b) => Some(b),
                _ => Some(candidate),
            })
    }

    /// Statistics over the union of all islands
    pub fn stats(&self) -> GenerationStats {
        let all: Vec<Individual> = self
            .islands
            .iter()
            .flat_map(|island| island.individuals().iter().cloned())
            .collect();
        GenerationStats::from_individuals(self.generation, self.evaluations(), &all)
    }
}

fn island_settings(config: &EngineConfig) -> EvoResult<&IslandConfig> {
    config
        .islands
        .as_ref()
        .ok_or_else(|| EvolutionError::Configuration("island model is not enabled".into()))
}
