//! 0/1 integer program for appliance scheduling
//!
//! One binary variable `x[i][h]` per appliance `i` and hour `h` means "appliance
//! `i` runs during hour `h`". The objective is the daily energy cost
//! `sum(x[i][h] * power(i) * rate(h))`, subject to:
//! - runtime rows: `sum_h x[i][h] == duration(i)` for every appliance
//! - max-power rows: `sum_i x[i][h] * power(i) <= max_power - base_load[h]` for every hour
//!
//! No contiguity or time-window rows are generated: any subset of hours with the
//! right size is a valid run.

use serde::Serialize;

use crate::domain::{ScheduleProblem, Tariff, HOURS_PER_DAY};
use crate::optimizer::OptimizerError;

/// Tolerance used when checking assignments against constraint rows
pub const FEASIBILITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecisionVariable {
    pub appliance: usize,
    pub hour: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintOp {
    Eq,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    Duration { appliance: usize },
    Capacity { hour: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    /// Sparse `(variable index, coefficient)` pairs
    pub terms: Vec<(usize, f64)>,
    pub op: ConstraintOp,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn lhs(&self, assignment: &[bool]) -> f64 {
        self.terms
            .iter()
            .filter(|(var, _)| assignment.get(*var).copied().unwrap_or(false))
            .map(|(_, coef)| coef)
            .sum()
    }

    pub fn is_satisfied(&self, assignment: &[bool]) -> bool {
        let lhs = self.lhs(assignment);
        match self.op {
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= FEASIBILITY_EPSILON,
            ConstraintOp::Le => lhs <= self.rhs + FEASIBILITY_EPSILON,
            ConstraintOp::Ge => lhs >= self.rhs - FEASIBILITY_EPSILON,
        }
    }
}

/// Minimization program over binary variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegerProgram {
    /// Appliance-major: index = appliance * 24 + hour
    pub variables: Vec<DecisionVariable>,
    /// Cost coefficient of each variable
    pub objective: Vec<f64>,
    pub constraints: Vec<LinearConstraint>,
    appliance_count: usize,
}

impl IntegerProgram {
    pub fn variable_index(appliance: usize, hour: usize) -> usize {
        appliance * HOURS_PER_DAY + hour
    }

    pub fn appliance_count(&self) -> usize {
        self.appliance_count
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn objective_value(&self, assignment: &[bool]) -> f64 {
        self.objective
            .iter()
            .zip(assignment)
            .filter(|(_, on)| **on)
            .map(|(coef, _)| coef)
            .sum()
    }

    /// First constraint the assignment breaks, if any
    pub fn first_violation(&self, assignment: &[bool]) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| !c.is_satisfied(assignment))
    }

    pub fn is_feasible(&self, assignment: &[bool]) -> bool {
        assignment.len() == self.num_variables() && self.first_violation(assignment).is_none()
    }
}

/// Build the integer program for a validated problem
pub fn formulate(problem: &ScheduleProblem, tariff: &Tariff) -> Result<IntegerProgram, OptimizerError> {
    problem.validate()?;

    let n = problem.appliances.len();
    let mut variables = Vec::with_capacity(n * HOURS_PER_DAY);
    let mut objective = Vec::with_capacity(n * HOURS_PER_DAY);

    for (appliance, load) in problem.appliances.iter().enumerate() {
        for hour in 0..HOURS_PER_DAY {
            variables.push(DecisionVariable { appliance, hour });
            objective.push(load.power_kw * tariff.rate_at(hour));
        }
    }

    let mut constraints = Vec::with_capacity(n + HOURS_PER_DAY);

    for (appliance, load) in problem.appliances.iter().enumerate() {
        constraints.push(LinearConstraint {
            name: format!("runtime_{}", load.id),
            kind: ConstraintKind::Duration { appliance },
            terms: (0..HOURS_PER_DAY)
                .map(|hour| (IntegerProgram::variable_index(appliance, hour), 1.0))
                .collect(),
            op: ConstraintOp::Eq,
            rhs: f64::from(load.duration_hours),
        });
    }

    for hour in 0..HOURS_PER_DAY {
        constraints.push(LinearConstraint {
            name: format!("max_power_{}", hour),
            kind: ConstraintKind::Capacity { hour },
            terms: problem
                .appliances
                .iter()
                .enumerate()
                .map(|(appliance, load)| {
                    (IntegerProgram::variable_index(appliance, hour), load.power_kw)
                })
                .collect(),
            op: ConstraintOp::Le,
            rhs: problem.max_power_kw - problem.base_load[hour],
        });
    }

    Ok(IntegerProgram {
        variables,
        objective,
        constraints,
        appliance_count: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Appliance;
    use approx::assert_relative_eq;

    fn two_appliance_problem() -> ScheduleProblem {
        let mut base_load = vec![0.5; HOURS_PER_DAY];
        base_load[19] = 2.0;
        ScheduleProblem::new(
            vec![
                Appliance::new(1u64, "AC", 1.5, 4, 19),
                Appliance::new(2u64, "Water heater", 2.0, 2, 6),
            ],
            base_load,
            8.0,
        )
    }

    #[test]
    fn test_variable_grid_shape() {
        let program = formulate(&two_appliance_problem(), &Tariff::default()).unwrap();
        assert_eq!(program.num_variables(), 48);
        assert_eq!(program.appliance_count(), 2);
        assert_eq!(
            program.variables[IntegerProgram::variable_index(1, 5)],
            DecisionVariable { appliance: 1, hour: 5 }
        );
    }

    #[test]
    fn test_objective_coefficients() {
        let program = formulate(&two_appliance_problem(), &Tariff::default()).unwrap();
        assert_relative_eq!(program.objective[IntegerProgram::variable_index(0, 0)], 1.5 * 4.50);
        assert_relative_eq!(program.objective[IntegerProgram::variable_index(0, 12)], 1.5 * 6.00);
        assert_relative_eq!(program.objective[IntegerProgram::variable_index(1, 20)], 2.0 * 8.50);
    }

    #[test]
    fn test_constraint_rows() {
        let program = formulate(&two_appliance_problem(), &Tariff::default()).unwrap();
        assert_eq!(program.num_constraints(), 2 + 24);

        let runtime = &program.constraints[0];
        assert_eq!(runtime.name, "runtime_1");
        assert_eq!(runtime.op, ConstraintOp::Eq);
        assert_eq!(runtime.rhs, 4.0);
        assert_eq!(runtime.terms.len(), 24);
        assert!(runtime.terms.iter().all(|(_, coef)| *coef == 1.0));

        let evening = program
            .constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::Capacity { hour: 19 })
            .unwrap();
        assert_eq!(evening.name, "max_power_19");
        assert_eq!(evening.op, ConstraintOp::Le);
        assert_relative_eq!(evening.rhs, 6.0);
        assert_eq!(evening.terms, vec![(19, 1.5), (43, 2.0)]);
    }

    #[test]
    fn test_invalid_problem_not_formulated() {
        let mut problem = two_appliance_problem();
        problem.base_load.truncate(23);
        assert!(matches!(
            formulate(&problem, &Tariff::default()),
            Err(OptimizerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_overloaded_base_load_still_formulated() {
        let mut problem = two_appliance_problem();
        problem.base_load[3] = 9.0;
        let program = formulate(&problem, &Tariff::default()).unwrap();
        assert!(program.constraints.iter().any(|c| c.rhs < 0.0));
    }

    #[test]
    fn test_assignment_evaluation() {
        let program = formulate(&two_appliance_problem(), &Tariff::default()).unwrap();
        let mut assignment = vec![false; program.num_variables()];
        for hour in 0..4 {
            assignment[IntegerProgram::variable_index(0, hour)] = true;
        }
        assert!(!program.is_feasible(&assignment));
        assert_eq!(program.first_violation(&assignment).unwrap().name, "runtime_2");

        assignment[IntegerProgram::variable_index(1, 22)] = true;
        assignment[IntegerProgram::variable_index(1, 23)] = true;
        assert!(program.is_feasible(&assignment));
        assert_relative_eq!(program.objective_value(&assignment), 1.5 * 4.5 * 4.0 + 2.0 * 4.5 * 2.0);
    }
}
