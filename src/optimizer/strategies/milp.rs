//! MILP (Mixed-Integer Linear Programming) backend
//!
//! Hands the appliance program to the `good_lp` modeller with binary variables and
//! solves it with the pure-Rust microlp backend. Useful as a cross-check of the
//! branch-and-bound solver and as a starting point for commercial solvers
//! (CBC, HiGHS) that good_lp also drives.
//!
//! microlp has no time limit; a requested limit is only checked before the solve
//! starts.

#[cfg(feature = "optimization")]
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};

use crate::optimizer::{IlpSolver, IntegerProgram, SolveLimits, SolveOutcome};

/// MILP solver backed by good_lp
#[derive(Debug, Clone, Default)]
pub struct MilpSolver;

impl MilpSolver {
    /// Whether this build carries the good_lp backend
    pub fn is_available() -> bool {
        cfg!(feature = "optimization")
    }

    #[cfg(feature = "optimization")]
    fn solve_lp(&self, program: &IntegerProgram) -> SolveOutcome {
        use crate::optimizer::ConstraintOp;

        let mut problem = ProblemVariables::new();
        let x: Vec<Variable> = (0..program.num_variables())
            .map(|_| problem.add(variable().binary()))
            .collect();

        let objective: Expression = program
            .objective
            .iter()
            .zip(&x)
            .map(|(coef, var)| *coef * *var)
            .sum();

        let mut model = problem.minimise(objective).using(default_solver);

        for row in &program.constraints {
            let lhs: Expression = row.terms.iter().map(|(var, coef)| *coef * x[*var]).sum();
            let rhs = row.rhs;
            model = match row.op {
                ConstraintOp::Eq => model.with(constraint!(lhs == rhs)),
                ConstraintOp::Le => model.with(constraint!(lhs <= rhs)),
                ConstraintOp::Ge => model.with(constraint!(lhs >= rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => {
                let assignment: Vec<bool> = x.iter().map(|var| solution.value(*var) > 0.5).collect();
                let objective = program.objective_value(&assignment);
                SolveOutcome::optimal(assignment, objective, 0)
            }
            Err(ResolutionError::Infeasible) => {
                SolveOutcome::infeasible(0, "MILP solver reports the program infeasible")
            }
            Err(e) => SolveOutcome::error(format!("MILP solver failed: {}", e)),
        }
    }

    #[cfg(not(feature = "optimization"))]
    fn solve_lp(&self, _program: &IntegerProgram) -> SolveOutcome {
        SolveOutcome::error("MILP optimization requires 'optimization' feature to be enabled")
    }
}

impl IlpSolver for MilpSolver {
    fn name(&self) -> &'static str {
        "milp"
    }

    fn solve(&self, program: &IntegerProgram, limits: &SolveLimits) -> SolveOutcome {
        if limits.time_limit.is_some() {
            tracing::warn!("MILP backend cannot enforce a time limit; checking it only before the solve");
        }
        if limits.start().expired() {
            return SolveOutcome::timeout(0);
        }
        self.solve_lp(program)
    }
}
