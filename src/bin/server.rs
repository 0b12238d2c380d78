use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uos_hub::{HubConfig, HubService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = HubConfig::from_env();
    info!("Starting UOS Hub, current term {}", uos_hub::current_term_code());

    let service = HubService::from_config(&config).map_err(|e| anyhow::anyhow!("{e}"))?;
    let app = service.router();

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
