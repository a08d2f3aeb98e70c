use quota_guard::services::sweep_service::SweepService;
use quota_guard::{
    config::{get_config, init_config, StoreBackend},
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let app_state = AppState::from_config(config).await?;

    info!(
        window_ms = config.page_rate_limit.window_ms,
        max_requests = config.page_rate_limit.max_requests,
        "Page rate limit"
    );
    info!(
        window_ms = config.api_rate_limit.window_ms,
        max_requests = config.api_rate_limit.max_requests,
        "API rate limit"
    );

    match &config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory counter store");
            let sweeper = SweepService::new(app_state.store.clone(), app_state.clock.clone());
            let interval = config.sweep_interval;
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    if let Err(e) = sweeper.run_once().await {
                        tracing::error!(error = ?e, "Rate limit sweep failed");
                    }
                }
            });
        }
        StoreBackend::Redis { key_prefix, .. } => {
            info!("Using Redis counter store with key prefix {}", key_prefix);
        }
    }

    let app = routes::build_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
