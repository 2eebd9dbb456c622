use anyhow::Context;

use feedforge_api::app::{build_app, config::ApiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedforge_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let app = build_app(&config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        max_rounds = config.optimizer.max_rounds,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
