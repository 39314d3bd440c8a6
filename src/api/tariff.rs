use axum::{extract::State, Json};
use serde::Serialize;

use crate::{controller::AppState, domain::Tier};

#[derive(Debug, Serialize)]
pub struct TariffHour {
    pub hour: u32,
    pub rate: f64,
    pub tier: Tier,
}

/// GET /api/tariff - Price of every hour of the day
pub async fn get_tariff(State(state): State<AppState>) -> Json<Vec<TariffHour>> {
    let hours = state
        .engine
        .tariff()
        .table()
        .map(|(hour, price)| TariffHour {
            hour,
            rate: price.rate,
            tier: price.tier,
        })
        .collect();
    Json(hours)
}
