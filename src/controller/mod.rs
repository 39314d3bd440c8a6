use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use crate::config::{Config, SolverKind};
use crate::optimizer::{BranchAndBoundSolver, IlpSolver, MilpSolver, SchedulingEngine, SolveLimits};

/// Shared, read-only state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub engine: Arc<SchedulingEngine>,
}

impl AppState {
    pub fn new(cfg: Config) -> Result<Self> {
        let tariff = cfg.tariff()?;
        let solver = build_solver(cfg.optimizer.solver)?;

        let limits = match cfg.optimizer.time_limit() {
            Some(limit) => SolveLimits::with_time_limit(limit),
            None => SolveLimits::unlimited(),
        };
        let engine = SchedulingEngine::new(tariff, solver).with_limits(limits);

        info!(
            solver = engine.solver_name(),
            time_limit_ms = cfg.optimizer.time_limit_ms,
            "scheduling engine ready"
        );

        Ok(Self {
            cfg,
            engine: Arc::new(engine),
        })
    }
}

fn build_solver(kind: SolverKind) -> Result<Arc<dyn IlpSolver>> {
    match kind {
        SolverKind::BranchAndBound => Ok(Arc::new(BranchAndBoundSolver::default())),
        SolverKind::Milp if MilpSolver::is_available() => Ok(Arc::new(MilpSolver)),
        SolverKind::Milp => bail!("solver 'milp' requires the 'optimization' feature"),
    }
}
