use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blogshift_api::{build_router, AppState};
use blogshift_common::Config;
use blogshift_core::{ButterStore, ContentStore, Migrator};
use buttercms_client::ButterClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("blogshift=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let client = ButterClient::new(
        &config.buttercms_api_url,
        &config.buttercms_read_token,
        Some(&config.buttercms_write_token),
    )?;
    let store: Arc<dyn ContentStore> = Arc::new(ButterStore::new(client, &config.page_type));

    let state = Arc::new(AppState {
        migrator: Migrator::from_config(store, &config),
    });
    let app = build_router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Blogshift API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
