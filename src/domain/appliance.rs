use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::HOURS_PER_DAY;
use crate::optimizer::OptimizerError;

/// Appliance identifier as supplied by the caller, echoed back unchanged
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApplianceId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ApplianceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplianceId::Number(n) => write!(f, "{}", n),
            ApplianceId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for ApplianceId {
    fn from(n: u64) -> Self {
        ApplianceId::Number(n)
    }
}

impl From<&str> for ApplianceId {
    fn from(s: &str) -> Self {
        ApplianceId::Text(s.to_string())
    }
}

/// One deferrable load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appliance {
    pub id: ApplianceId,
    pub name: String,
    /// Constant draw while running
    pub power_kw: f64,
    /// Hours the appliance must run per day, not necessarily contiguous
    pub duration_hours: u32,
    /// Hour the appliance would start at without optimization
    pub preferred_hour: u32,
}

impl Appliance {
    pub fn new(
        id: impl Into<ApplianceId>,
        name: impl Into<String>,
        power_kw: f64,
        duration_hours: u32,
        preferred_hour: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            power_kw,
            duration_hours,
            preferred_hour,
        }
    }

    /// The naive run: `duration_hours` consecutive hours from `preferred_hour`, wrapping at midnight
    pub fn preferred_hours(&self) -> impl Iterator<Item = usize> {
        let start = self.preferred_hour as usize;
        (0..self.duration_hours as usize).map(move |offset| (start + offset) % HOURS_PER_DAY)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.power_kw.is_finite() || self.power_kw <= 0.0 {
            return Err(format!(
                "appliance {}: power must be positive, got {}",
                self.id, self.power_kw
            ));
        }
        if self.duration_hours == 0 || self.duration_hours as usize > HOURS_PER_DAY {
            return Err(format!(
                "appliance {}: duration must be between 1 and 24 hours, got {}",
                self.id, self.duration_hours
            ));
        }
        if self.preferred_hour as usize >= HOURS_PER_DAY {
            return Err(format!(
                "appliance {}: preferred hour must be between 0 and 23, got {}",
                self.id, self.preferred_hour
            ));
        }
        Ok(())
    }
}

/// Input of one optimization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleProblem {
    /// Output order follows this order
    pub appliances: Vec<Appliance>,
    /// Uncontrollable draw per hour, exactly 24 entries
    pub base_load: Vec<f64>,
    /// Ceiling on appliances plus base load in any hour
    pub max_power_kw: f64,
}

impl ScheduleProblem {
    pub fn new(appliances: Vec<Appliance>, base_load: Vec<f64>, max_power_kw: f64) -> Self {
        Self {
            appliances,
            base_load,
            max_power_kw,
        }
    }

    /// Problem with the same base load in every hour
    pub fn with_flat_base_load(appliances: Vec<Appliance>, base_load_kw: f64, max_power_kw: f64) -> Self {
        Self::new(appliances, vec![base_load_kw; HOURS_PER_DAY], max_power_kw)
    }

    pub fn validate(&self) -> Result<(), OptimizerError> {
        if self.appliances.is_empty() {
            return Err(OptimizerError::InvalidInput(
                "no appliances provided".to_string(),
            ));
        }

        for appliance in &self.appliances {
            appliance.validate().map_err(OptimizerError::InvalidInput)?;
        }
        if let Some(id) = self.appliances.iter().map(|a| &a.id).duplicates().next() {
            return Err(OptimizerError::InvalidInput(format!(
                "duplicate appliance id {}",
                id
            )));
        }

        if self.base_load.len() != HOURS_PER_DAY {
            return Err(OptimizerError::InvalidInput(format!(
                "base load must have 24 hourly values, got {}",
                self.base_load.len()
            )));
        }
        if let Some((hour, load)) = self
            .base_load
            .iter()
            .enumerate()
            .find(|(_, l)| !l.is_finite() || **l < 0.0)
        {
            return Err(OptimizerError::InvalidInput(format!(
                "base load at hour {} must be non-negative, got {}",
                hour, load
            )));
        }

        if !self.max_power_kw.is_finite() || self.max_power_kw <= 0.0 {
            return Err(OptimizerError::InvalidInput(format!(
                "max power must be positive, got {}",
                self.max_power_kw
            )));
        }

        Ok(())
    }
}
