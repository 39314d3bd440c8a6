use anyhow::Result;
use axum::Router;
use home_energy_scheduler::{api, config, controller, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let app_state = controller::AppState::new(cfg.clone())?;

    #[allow(unused_mut)]
    let mut app: Router = api::router(app_state, &cfg);

    #[cfg(feature = "metrics")]
    {
        app = api::with_metrics(app);
    }

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("server binding to 0.0.0.0, the optimizer API is reachable from the network");
    }

    info!(%addr, "starting home energy scheduler");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
