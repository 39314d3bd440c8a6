use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::controller::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    /// Solver selected at startup
    solver: &'static str,
    timestamp: DateTime<Utc>,
}

/// GET /api/health - Liveness plus the active solver
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        solver: state.engine.solver_name(),
        timestamp: Utc::now(),
    })
}
