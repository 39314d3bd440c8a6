pub mod engine;
pub mod error;
pub mod formulation;
pub mod solver;
pub mod strategies;

pub use engine::*;
pub use error::*;
pub use formulation::*;
pub use solver::*;
pub use strategies::*;
