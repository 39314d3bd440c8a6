use serde::Serialize;
use uuid::Uuid;

use super::{ApplianceId, Tier};

/// Optimized schedule of one appliance compared against its naive run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplianceSchedule {
    pub id: ApplianceId,
    pub name: String,
    pub power_kw: f64,
    pub duration_hours: u32,
    pub preferred_hour: u32,
    /// Ascending, exactly `duration_hours` entries
    pub scheduled_hours: Vec<u32>,
    /// Earliest scheduled hour
    pub optimized_hour: u32,
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub savings: f64,
    pub savings_percent: f64,
    pub has_change: bool,
    pub original_tier: Tier,
    pub optimized_tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationSummary {
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub daily_savings: f64,
    pub monthly_savings: f64,
    pub annual_savings: f64,
    pub savings_percent: f64,
    /// Base load plus scheduled appliance draw, hour 0 first
    pub load_profile: Vec<f64>,
    pub peak_load_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub run_id: Uuid,
    /// Solver that produced the schedule
    pub method: String,
    /// Same order as the input appliances
    pub appliances: Vec<ApplianceSchedule>,
    pub summary: OptimizationSummary,
}

impl OptimizationResult {
    pub fn appliance(&self, id: &ApplianceId) -> Option<&ApplianceSchedule> {
        self.appliances.iter().find(|a| &a.id == id)
    }
}

/// `savings / original * 100`, or 0 when there is nothing to save against
pub fn savings_percent(original: f64, savings: f64) -> f64 {
    if original > 0.0 {
        savings / original * 100.0
    } else {
        0.0
    }
}
