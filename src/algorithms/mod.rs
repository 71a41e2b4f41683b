//! Run drivers
//!
//! The island model and the optimizer that picks between it and a single population.

pub mod engine;
pub mod island;

pub mod prelude {
    pub use super::engine::*;
    pub use super::island::*;
}
