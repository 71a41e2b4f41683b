//! # evo-islands
//!
//! Self-adaptive evolution strategies for bounded black-box optimization, with an
//! optional island model.
//!
//! A run evolves fixed-dimension real vectors inside one shared interval under a fixed
//! evaluation budget. Each generation selects parents, recombines them, mutates the
//! offspring, evaluates them, and picks survivors. Mutation step sizes, and optionally
//! rotation angles, live inside each individual and evolve with it.
//!
//! ## Core Concepts
//!
//! - **Immutable configuration**: one [`config::EngineConfig`] value, validated up
//!   front and shared by every operator
//! - **Budget as the stop condition**: running out of evaluations ends the run
//!   cleanly and keeps the last fully evaluated population
//! - **Message-passing migration**: islands stage export batches before any import
//!
//! ## Quick Start
//!
//! ```rust
//! use evo_islands::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//!
//! let config = EngineConfig::builder()
//!     .dimension(5)
//!     .population_size(20)
//!     .mutation(MutationStrategy::Correlated)
//!     .parent_selection(ParentSelection::LinearRank { pressure: 1.5 })
//!     .build()?;
//!
//! let mut evaluator = BudgetedEvaluator::new(Sphere::new(5), 2_000);
//! let summary = Optimizer::new(config, &mut rng)?.run(&mut evaluator, &mut rng)?;
//! assert_eq!(summary.evaluations, 2_000);
//! # Ok::<(), EvolutionError>(())
//! ```

pub mod algorithms;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod hyperparameter;
pub mod operators;
pub mod population;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::config::*;
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::hyperparameter::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
}
