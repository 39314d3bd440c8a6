//! Time-of-use tariff: hour of day to rate and pricing tier.
//!
//! A [`Tariff`] is built once from a list of [`TariffBand`]s, validated to cover
//! every hour of the day exactly once, and then answers lookups from a fixed
//! 24-entry table. It holds no interior state and is shared freely across threads.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use super::HOURS_PER_DAY;

/// Named pricing band an hour falls into
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Tier {
    OffPeak,
    Normal,
    Peak,
}

/// Half-open hour range `[start_hour, end_hour)` billed at one rate.
///
/// `start_hour > end_hour` wraps past midnight, e.g. `22 -> 6`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffBand {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Rate in currency units per kWh
    pub rate: f64,
    pub tier: Tier,
}

impl TariffBand {
    pub fn new(start_hour: u32, end_hour: u32, rate: f64, tier: Tier) -> Self {
        Self {
            start_hour,
            end_hour,
            rate,
            tier,
        }
    }

    /// Hours covered by this band, in order of occurrence starting at `start_hour`
    pub fn hours(&self) -> impl Iterator<Item = u32> {
        let day = HOURS_PER_DAY as u32;
        let len = if self.start_hour < self.end_hour {
            self.end_hour - self.start_hour
        } else {
            day - self.start_hour + self.end_hour
        };
        let start = self.start_hour;
        (0..len).map(move |offset| (start + offset) % day)
    }
}

/// Price of one hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyPrice {
    pub rate: f64,
    pub tier: Tier,
}

#[derive(Debug, Error, PartialEq)]
pub enum TariffError {
    #[error("hour {0} is outside 0-23")]
    HourOutOfRange(u32),

    #[error("band {start}-{end} has an hour outside 0-24")]
    InvalidHour { start: u32, end: u32 },

    #[error("band {start}-{end} has an empty hour range")]
    EmptyBand { start: u32, end: u32 },

    #[error("band {start}-{end} has invalid rate {rate}")]
    InvalidRate { start: u32, end: u32, rate: f64 },

    #[error("hour {0} is covered by more than one band")]
    Overlap(u32),

    #[error("hour {0} is not covered by any band")]
    Uncovered(u32),
}

/// Validated 24-hour price table
#[derive(Debug, Clone, PartialEq)]
pub struct Tariff {
    bands: Vec<TariffBand>,
    table: [HourlyPrice; HOURS_PER_DAY],
}

impl Tariff {
    pub fn new(bands: Vec<TariffBand>) -> Result<Self, TariffError> {
        let mut slots: [Option<HourlyPrice>; HOURS_PER_DAY] = [None; HOURS_PER_DAY];

        for band in &bands {
            let (start, end) = (band.start_hour, band.end_hour);
            if start >= HOURS_PER_DAY as u32 || end > HOURS_PER_DAY as u32 {
                return Err(TariffError::InvalidHour { start, end });
            }
            if start == end {
                return Err(TariffError::EmptyBand { start, end });
            }
            if !band.rate.is_finite() || band.rate < 0.0 {
                return Err(TariffError::InvalidRate {
                    start,
                    end,
                    rate: band.rate,
                });
            }

            for hour in band.hours() {
                let slot = &mut slots[hour as usize];
                if slot.is_some() {
                    return Err(TariffError::Overlap(hour));
                }
                *slot = Some(HourlyPrice {
                    rate: band.rate,
                    tier: band.tier,
                });
            }
        }

        let mut table = [HourlyPrice {
            rate: 0.0,
            tier: Tier::Normal,
        }; HOURS_PER_DAY];
        for (hour, slot) in slots.into_iter().enumerate() {
            table[hour] = slot.ok_or(TariffError::Uncovered(hour as u32))?;
        }

        Ok(Self { bands, table })
    }

    pub fn price(&self, hour: u32) -> Result<HourlyPrice, TariffError> {
        self.table
            .get(hour as usize)
            .copied()
            .ok_or(TariffError::HourOutOfRange(hour))
    }

    pub fn rate(&self, hour: u32) -> Result<f64, TariffError> {
        self.price(hour).map(|p| p.rate)
    }

    pub fn tier(&self, hour: u32) -> Result<Tier, TariffError> {
        self.price(hour).map(|p| p.tier)
    }

    /// Rate of an hour index already known to be in range
    pub(crate) fn rate_at(&self, hour: usize) -> f64 {
        self.table[hour % HOURS_PER_DAY].rate
    }

    pub(crate) fn tier_at(&self, hour: usize) -> Tier {
        self.table[hour % HOURS_PER_DAY].tier
    }

    /// Highest rate of the day
    pub fn peak_rate(&self) -> f64 {
        self.table.iter().map(|p| p.rate).fold(0.0, f64::max)
    }

    pub fn bands(&self) -> &[TariffBand] {
        &self.bands
    }

    /// All 24 hours with their price, hour 0 first
    pub fn table(&self) -> impl Iterator<Item = (u32, HourlyPrice)> + '_ {
        self.table
            .iter()
            .enumerate()
            .map(|(hour, price)| (hour as u32, *price))
    }
}

impl Default for Tariff {
    /// Off-peak nights, peak evenings, normal daytime
    fn default() -> Self {
        Self::new(default_bands()).expect("built-in tariff covers the whole day")
    }
}

pub fn default_bands() -> Vec<TariffBand> {
    vec![
        TariffBand::new(22, 6, 4.50, Tier::OffPeak),
        TariffBand::new(6, 18, 6.00, Tier::Normal),
        TariffBand::new(18, 22, 8.50, Tier::Peak),
    ]
}
