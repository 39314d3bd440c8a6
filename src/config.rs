use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::domain::{default_bands, Tariff, TariffBand};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub optimizer: OptimizerConfig,
    pub tariff: TariffConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 30,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SolverKind {
    BranchAndBound,
    Milp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub solver: SolverKind,
    /// 0 disables the limit
    pub time_limit_ms: u64,
    pub default_max_power_kw: f64,
    pub default_base_load_kw: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            solver: SolverKind::BranchAndBound,
            time_limit_ms: 5000,
            default_max_power_kw: 8.0,
            default_base_load_kw: 0.5,
        }
    }
}

impl OptimizerConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit_ms > 0).then(|| Duration::from_millis(self.time_limit_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffConfig {
    pub bands: Vec<TariffBand>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("HES__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().context("invalid configuration")
    }

    pub fn tariff(&self) -> Result<Tariff> {
        Tariff::new(self.tariff.bands.clone()).context("invalid tariff configuration")
    }
}
