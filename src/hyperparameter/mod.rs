//! Strategy parameters
//!
//! Self-adaptive step sizes and rotation angles, and the learning rates that drive them.

pub mod self_adaptive;

pub mod prelude {
    pub use super::self_adaptive::*;
}
