use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::error::ApiError,
    config::OptimizerConfig,
    controller::AppState,
    domain::{
        Appliance, ApplianceId, ApplianceSchedule, OptimizationResult, OptimizationSummary,
        ScheduleProblem, Tier, HOURS_PER_DAY,
    },
    optimizer::{CancellationFlag, SolveLimits},
};

/// Request body of `POST /api/optimize`
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    #[validate(length(min = 1, message = "no appliances provided"), nested)]
    pub appliances: Vec<ApplianceRequest>,
    /// Defaults to the configured flat base load
    #[validate(length(equal = 24, message = "base load must have 24 hourly values"))]
    pub base_load: Option<Vec<f64>>,
    #[validate(range(exclusive_min = 0.0, message = "max power must be positive"))]
    pub max_power: Option<f64>,
    /// Overrides the configured solver time limit
    #[validate(range(min = 1, max = 600000))]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceRequest {
    pub id: ApplianceId,
    #[serde(default)]
    pub name: String,
    #[validate(range(exclusive_min = 0.0, message = "power must be positive"))]
    pub power: f64,
    #[validate(range(min = 1, max = 24, message = "duration must be between 1 and 24 hours"))]
    pub duration: u32,
    #[validate(range(max = 23, message = "preferred hour must be between 0 and 23"))]
    pub preferred_hour: u32,
}

impl OptimizeRequest {
    pub fn into_problem(self, defaults: &OptimizerConfig) -> ScheduleProblem {
        let appliances = self
            .appliances
            .into_iter()
            .map(|a| Appliance::new(a.id, a.name, a.power, a.duration, a.preferred_hour))
            .collect();
        let base_load = self
            .base_load
            .unwrap_or_else(|| vec![defaults.default_base_load_kw; HOURS_PER_DAY]);
        let max_power = self.max_power.unwrap_or(defaults.default_max_power_kw);
        ScheduleProblem::new(appliances, base_load, max_power)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse {
    pub success: bool,
    pub method: String,
    pub run_id: Uuid,
    pub results: Vec<ApplianceResult>,
    pub summary: SummaryResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceResult {
    pub id: ApplianceId,
    pub name: String,
    pub power: f64,
    pub duration: u32,
    pub original_hour: u32,
    pub optimized_hour: u32,
    pub scheduled_hours: Vec<u32>,
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub savings: f64,
    pub savings_percent: f64,
    pub has_change: bool,
    pub original_tier: Tier,
    pub optimized_tier: Tier,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub daily_savings: f64,
    pub monthly_savings: f64,
    pub annual_savings: f64,
    pub savings_percent: f64,
    pub peak_load: f64,
    pub load_profile: Vec<f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl From<ApplianceSchedule> for ApplianceResult {
    fn from(s: ApplianceSchedule) -> Self {
        Self {
            id: s.id,
            name: s.name,
            power: s.power_kw,
            duration: s.duration_hours,
            original_hour: s.preferred_hour,
            optimized_hour: s.optimized_hour,
            scheduled_hours: s.scheduled_hours,
            original_cost: round2(s.original_cost),
            optimized_cost: round2(s.optimized_cost),
            savings: round2(s.savings),
            savings_percent: round1(s.savings_percent),
            has_change: s.has_change,
            original_tier: s.original_tier,
            optimized_tier: s.optimized_tier,
        }
    }
}

impl From<OptimizationSummary> for SummaryResponse {
    fn from(s: OptimizationSummary) -> Self {
        Self {
            original_cost: round2(s.original_cost),
            optimized_cost: round2(s.optimized_cost),
            daily_savings: round2(s.daily_savings),
            monthly_savings: round2(s.monthly_savings),
            annual_savings: round2(s.annual_savings),
            savings_percent: round1(s.savings_percent),
            peak_load: round2(s.peak_load_kw),
            load_profile: s.load_profile.into_iter().map(round2).collect(),
        }
    }
}

impl From<OptimizationResult> for OptimizeResponse {
    fn from(result: OptimizationResult) -> Self {
        Self {
            success: true,
            method: result.method,
            run_id: result.run_id,
            results: result.appliances.into_iter().map(Into::into).collect(),
            summary: result.summary.into(),
        }
    }
}

/// Raises the flag when the request future is dropped, e.g. by the timeout layer
struct CancelOnDrop(CancellationFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// POST /api/optimize - Schedule appliances into the cheapest feasible hours
pub async fn optimize(
    State(state): State<AppState>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, ApiError> {
    request.validate()?;

    let time_limit = request
        .timeout_ms
        .map(Duration::from_millis)
        .or(state.engine.limits().time_limit);
    let problem = request.into_problem(&state.cfg.optimizer);
    tracing::debug!(appliances = problem.appliances.len(), "optimization requested");

    let cancel = CancellationFlag::new();
    let _guard = CancelOnDrop(cancel.clone());
    let limits = match time_limit {
        Some(limit) => SolveLimits::with_time_limit(limit),
        None => SolveLimits::unlimited(),
    }
    .with_cancel(cancel);

    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.optimize_with(&problem, &limits)).await??;

    Ok(Json(result.into()))
}
