use anyhow::{Context, Result};
use std::sync::Arc;

use mailora_dedup::config::Config;
use mailora_dedup::routes::{self, AppState};
use mailora_dedup::services::verification_service::VerificationService;
use mailora_dedup::{db, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = Config::from_env().context("reading configuration")?;

    let service = match init_service(&config).await {
        Ok(service) => {
            service.start().await;
            Some(service)
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "verification service failed to initialize; serving 503");
            None
        }
    };
    let state = match &service {
        Some(service) => AppState::new(service.clone()),
        None => AppState::unavailable(),
    };

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(service) = service {
        service.stop().await;
    }
    Ok(())
}

async fn init_service(config: &Config) -> Result<Arc<VerificationService>> {
    let pool = db::connect(&config.database_url).await?;
    db::create_schema(&pool).await.context("creating schema")?;
    Ok(Arc::new(VerificationService::new(pool, config.worker_stop_timeout)))
}

async fn shutdown_signal() {
    use tokio::signal;
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let term = async {
        if let Ok(mut s) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            s.recv().await;
        }
    };
    #[cfg(not(unix))]
    let term = std::future::pending::<()>();
    tokio::select! { _ = ctrl_c => {}, _ = term => {} }
    tracing::info!("shutdown signal received");
}
