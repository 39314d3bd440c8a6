use std::time::Duration;

use thiserror::Error;

/// Failure of one optimization call. No variant carries a partial schedule.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    /// Malformed problem, rejected before the solver runs
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no feasible schedule exists: {0}")]
    Infeasible(String),

    #[error("solver exceeded its time budget after {elapsed:?}")]
    SolverTimeout { elapsed: Duration },

    /// Solver backend failed to produce an answer
    #[error("solver error: {0}")]
    Solver(String),

    /// The solver claimed optimality but its assignment breaks the program
    #[error("solver contract violated: {0}")]
    SolverContract(String),
}

impl OptimizerError {
    /// Error kind as exposed to callers
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizerError::InvalidInput(_) => "InvalidInput",
            OptimizerError::Infeasible(_) => "Infeasible",
            OptimizerError::SolverTimeout { .. } => "SolverTimeout",
            OptimizerError::Solver(_) => "SolverError",
            OptimizerError::SolverContract(_) => "SolverContract",
        }
    }
}
