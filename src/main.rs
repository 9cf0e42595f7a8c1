use std::sync::Arc;
use std::time::Duration;

use medexpo_backend::{
    checkout::CheckoutService,
    config::AppConfig,
    db::Db,
    http::{self, AppState},
    logger::init_tracing,
    metrics::counters::Counters,
    pricing::{adjustment::PricingPolicy, job::PricingJob, repository::SqlxPricingRepository},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting medexpo backend...");

    let cfg = AppConfig::from_env();

    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;

    let counters = Counters::default();

    let checkout = Arc::new(CheckoutService::new(db.clone(), &cfg, counters.clone()));

    let pricing_repo = Arc::new(SqlxPricingRepository::new(db.pool.as_ref().clone()));
    let pricing_job = Arc::new(PricingJob::new(
        pricing_repo,
        PricingPolicy::from_config(&cfg),
        counters.clone(),
    ));
    pricing_job.spawn_loop(Duration::from_secs(cfg.pricing_interval_secs));

    let app = http::router(AppState { checkout });

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "HTTP surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
