use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    savings_percent, Appliance, ApplianceSchedule, OptimizationResult, OptimizationSummary,
    ScheduleProblem, Tariff, HOURS_PER_DAY,
};
use crate::optimizer::{
    formulate, IlpSolver, IntegerProgram, OptimizerError, SolveLimits, SolveOutcome, SolveStatus,
};

const DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Formulates, solves and interprets one schedule problem per call.
///
/// The engine keeps no per-call state, so one instance can serve any number of
/// concurrent `optimize` calls.
#[derive(Clone)]
pub struct SchedulingEngine {
    tariff: Tariff,
    solver: Arc<dyn IlpSolver>,
    limits: SolveLimits,
}

impl SchedulingEngine {
    pub fn new(tariff: Tariff, solver: Arc<dyn IlpSolver>) -> Self {
        Self {
            tariff,
            solver,
            limits: SolveLimits::unlimited(),
        }
    }

    /// Default limits for `optimize`
    pub fn with_limits(mut self, limits: SolveLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn tariff(&self) -> &Tariff {
        &self.tariff
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    pub fn limits(&self) -> &SolveLimits {
        &self.limits
    }

    pub fn optimize(&self, problem: &ScheduleProblem) -> Result<OptimizationResult, OptimizerError> {
        self.optimize_with(problem, &self.limits)
    }

    pub fn optimize_with(
        &self,
        problem: &ScheduleProblem,
        limits: &SolveLimits,
    ) -> Result<OptimizationResult, OptimizerError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();

        let program = formulate(problem, &self.tariff)?;
        let outcome = self.solver.solve(&program, limits);
        let nodes = outcome.nodes_explored;
        let assignment = self.accept(run_id, &program, outcome, started)?;

        let appliances = problem
            .appliances
            .iter()
            .enumerate()
            .map(|(index, appliance)| self.interpret(run_id, index, appliance, &assignment))
            .collect::<Result<Vec<_>, _>>()?;

        let summary = summarize(problem, &appliances);

        info!(
            run_id = %run_id,
            appliances = appliances.len(),
            solver = self.solver.name(),
            nodes,
            original_cost = summary.original_cost,
            optimized_cost = summary.optimized_cost,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "optimization complete"
        );

        Ok(OptimizationResult {
            run_id,
            method: self.solver.name().to_string(),
            appliances,
            summary,
        })
    }

    /// Cost of running entirely at the most expensive rate
    pub fn peak_cost(&self, appliance: &Appliance) -> f64 {
        appliance.power_kw * self.tariff.peak_rate() * f64::from(appliance.duration_hours)
    }

    /// Map a solver outcome to a checked assignment
    fn accept(
        &self,
        run_id: Uuid,
        program: &IntegerProgram,
        outcome: SolveOutcome,
        started: Instant,
    ) -> Result<Vec<bool>, OptimizerError> {
        let message = outcome.message.unwrap_or_default();
        match outcome.status {
            SolveStatus::Optimal => {
                let Some(assignment) = outcome.assignment else {
                    return Err(contract_violation(run_id, "optimal outcome carries no assignment"));
                };
                if assignment.len() != program.num_variables() {
                    return Err(contract_violation(
                        run_id,
                        &format!(
                            "assignment has {} values for {} variables",
                            assignment.len(),
                            program.num_variables()
                        ),
                    ));
                }
                if let Some(row) = program.first_violation(&assignment) {
                    return Err(contract_violation(
                        run_id,
                        &format!("assignment violates {}", row.name),
                    ));
                }
                Ok(assignment)
            }
            SolveStatus::Infeasible => {
                warn!(run_id = %run_id, solver = self.solver.name(), reason = %message, "schedule infeasible");
                Err(OptimizerError::Infeasible(message))
            }
            SolveStatus::Timeout => {
                let elapsed = started.elapsed();
                warn!(
                    run_id = %run_id,
                    solver = self.solver.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "solver timed out"
                );
                Err(OptimizerError::SolverTimeout { elapsed })
            }
            SolveStatus::Error => {
                error!(run_id = %run_id, solver = self.solver.name(), reason = %message, "solver failed");
                Err(OptimizerError::Solver(message))
            }
        }
    }

    fn interpret(
        &self,
        run_id: Uuid,
        index: usize,
        appliance: &Appliance,
        assignment: &[bool],
    ) -> Result<ApplianceSchedule, OptimizerError> {
        let scheduled: Vec<usize> = (0..HOURS_PER_DAY)
            .filter(|hour| assignment[IntegerProgram::variable_index(index, *hour)])
            .collect();

        if scheduled.len() != appliance.duration_hours as usize {
            return Err(contract_violation(
                run_id,
                &format!(
                    "appliance {} scheduled for {} hours, needs {}",
                    appliance.id,
                    scheduled.len(),
                    appliance.duration_hours
                ),
            ));
        }
        let Some(&optimized_hour) = scheduled.first() else {
            return Err(contract_violation(
                run_id,
                &format!("appliance {} has no scheduled hour", appliance.id),
            ));
        };

        let cost_of = |hours: &mut dyn Iterator<Item = usize>| -> f64 {
            hours.map(|h| appliance.power_kw * self.tariff.rate_at(h)).sum()
        };
        let optimized_cost = cost_of(&mut scheduled.iter().copied());
        let original_cost = cost_of(&mut appliance.preferred_hours());
        let savings = original_cost - optimized_cost;

        Ok(ApplianceSchedule {
            id: appliance.id.clone(),
            name: appliance.name.clone(),
            power_kw: appliance.power_kw,
            duration_hours: appliance.duration_hours,
            preferred_hour: appliance.preferred_hour,
            scheduled_hours: scheduled.iter().map(|h| *h as u32).collect(),
            optimized_hour: optimized_hour as u32,
            original_cost,
            optimized_cost,
            savings,
            savings_percent: savings_percent(original_cost, savings),
            has_change: optimized_hour as u32 != appliance.preferred_hour,
            original_tier: self.tariff.tier_at(appliance.preferred_hour as usize),
            optimized_tier: self.tariff.tier_at(optimized_hour),
        })
    }
}

fn contract_violation(run_id: Uuid, detail: &str) -> OptimizerError {
    error!(run_id = %run_id, detail, "solver contract violated");
    OptimizerError::SolverContract(detail.to_string())
}

fn summarize(problem: &ScheduleProblem, appliances: &[ApplianceSchedule]) -> OptimizationSummary {
    let original_cost: f64 = appliances.iter().map(|a| a.original_cost).sum();
    let optimized_cost: f64 = appliances.iter().map(|a| a.optimized_cost).sum();
    let daily_savings = original_cost - optimized_cost;

    let mut load_profile = problem.base_load.clone();
    for appliance in appliances {
        for hour in &appliance.scheduled_hours {
            load_profile[*hour as usize] += appliance.power_kw;
        }
    }
    let peak_load_kw = load_profile.iter().copied().fold(0.0, f64::max);

    OptimizationSummary {
        original_cost,
        optimized_cost,
        daily_savings,
        monthly_savings: daily_savings * DAYS_PER_MONTH,
        annual_savings: daily_savings * DAYS_PER_YEAR,
        savings_percent: savings_percent(original_cost, daily_savings),
        load_profile,
        peak_load_kw,
    }
}
