//! Solver backends
//!
//! - Branch-and-bound: exact reference solver, always available
//! - MILP: adapter to the `good_lp` modeller (needs the `optimization` feature)

pub mod branch_and_bound;
pub mod milp;

pub use branch_and_bound::*;
pub use milp::*;
