//! Objectives, budgeted evaluation, and benchmarks

pub mod benchmarks;
pub mod traits;

pub mod prelude {
    pub use super::benchmarks::*;
    pub use super::traits::*;
}
