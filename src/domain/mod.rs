pub mod appliance;
pub mod result;
pub mod tariff;

pub use appliance::*;
pub use result::*;
pub use tariff::*;

/// Scheduling horizon: one day of hourly slots
pub const HOURS_PER_DAY: usize = 24;
