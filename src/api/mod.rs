pub mod error;
pub mod health;
pub mod optimize;
pub mod tariff;

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, controller::AppState};

pub fn router(state: AppState, cfg: &Config) -> Router {
    let mut router = Router::new()
        .route("/api/optimize", post(optimize::optimize))
        .route("/api/tariff", get(tariff::get_tariff))
        .route("/api/health", get(health::health_check))
        .with_state(state);

    if cfg.server.enable_cors {
        use tower_http::cors::Any;
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.server.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(feature = "metrics")]
pub fn with_metrics(app: Router) -> Router {
    use axum_prometheus::PrometheusMetricLayer;
    let (layer, handle) = PrometheusMetricLayer::pair();

    let metrics_router =
        Router::new().route("/metrics", get(move || async move { handle.render() }));

    app.layer(layer).merge(metrics_router)
}
