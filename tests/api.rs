//! HTTP surface driven in-process through the router.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use home_energy_scheduler::{api, config::Config, controller::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let cfg = Config::default();
    let state = AppState::new(cfg.clone()).unwrap();
    api::router(state, &cfg)
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_optimize(body: Value) -> (StatusCode, Value) {
    send(
        Request::builder()
            .method(Method::POST)
            .uri("/api/optimize")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn get(uri: &str) -> (StatusCode, Value) {
    send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn optimize_returns_schedule_and_summary() {
    let (status, body) = post_optimize(json!({
        "appliances": [
            {"id": 1, "name": "Heater", "power": 2.0, "duration": 2, "preferredHour": 19}
        ],
        "baseLoad": vec![0.0; 24],
        "maxPower": 8.0
    }))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "branch-and-bound");
    assert!(body["runId"].is_string());

    let heater = &body["results"][0];
    assert_eq!(heater["id"], 1);
    assert_eq!(heater["originalHour"], 19);
    assert_eq!(heater["optimizedHour"], 0);
    assert_eq!(heater["scheduledHours"], json!([0, 1]));
    assert_eq!(heater["originalCost"], 34.0);
    assert_eq!(heater["optimizedCost"], 18.0);
    assert_eq!(heater["savings"], 16.0);
    assert_eq!(heater["savingsPercent"], 47.1);
    assert_eq!(heater["hasChange"], true);
    assert_eq!(heater["originalTier"], "peak");
    assert_eq!(heater["optimizedTier"], "off-peak");

    let summary = &body["summary"];
    assert_eq!(summary["dailySavings"], 16.0);
    assert_eq!(summary["monthlySavings"], 480.0);
    assert_eq!(summary["annualSavings"], 5840.0);
    assert_eq!(summary["peakLoad"], 2.0);
}

#[tokio::test]
async fn optimize_applies_configured_defaults() {
    let (status, body) = post_optimize(json!({
        "appliances": [
            {"id": "washer", "name": "Washing machine", "power": 0.5, "duration": 2, "preferredHour": 9}
        ]
    }))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["id"], "washer");
    assert_eq!(body["summary"]["loadProfile"][12], 0.5);
    assert_eq!(body["summary"]["peakLoad"], 1.0);
}

#[tokio::test]
async fn empty_appliance_list_is_rejected() {
    let (status, body) = post_optimize(json!({ "appliances": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert!(body["message"].as_str().unwrap().contains("no appliances provided"));
}

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let (status, body) = post_optimize(json!({
        "appliances": [
            {"id": 1, "name": "A", "power": 1.0, "duration": 1, "preferredHour": 3},
            {"id": 1, "name": "B", "power": 1.0, "duration": 1, "preferredHour": 4}
        ]
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("duplicate"));
}

#[tokio::test]
async fn impossible_ceiling_is_unprocessable() {
    let (status, body) = post_optimize(json!({
        "appliances": [
            {"id": 1, "name": "Kiln", "power": 5.0, "duration": 1, "preferredHour": 12},
            {"id": 2, "name": "Welder", "power": 5.0, "duration": 1, "preferredHour": 12}
        ],
        "baseLoad": vec![0.0; 24],
        "maxPower": 4.0
    }))
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Infeasible");
}

#[tokio::test]
async fn tariff_lists_every_hour() {
    let (status, body) = get("/api/tariff").await;
    assert_eq!(status, StatusCode::OK);

    let hours = body.as_array().unwrap();
    assert_eq!(hours.len(), 24);
    assert_eq!(hours[3]["tier"], "off-peak");
    assert_eq!(hours[12]["rate"], 6.0);
    assert_eq!(hours[18]["tier"], "peak");
}

#[tokio::test]
async fn health_reports_solver() {
    let (status, body) = get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["solver"], "branch-and-bound");
}

#[tokio::test]
async fn overbooked_day_is_unprocessable_not_timed_out() {
    // Three 5 kW loads of 9 h each need 27 distinct hours under an 8 kW ceiling
    let appliance = |id: u32| json!({"id": id, "name": "Load", "power": 5.0, "duration": 9, "preferredHour": 18});
    let (status, body) = post_optimize(json!({
        "appliances": [appliance(1), appliance(2), appliance(3)],
        "baseLoad": vec![0.0; 24],
        "maxPower": 8.0
    }))
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Infeasible");
}
