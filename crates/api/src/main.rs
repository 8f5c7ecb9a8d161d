use anyhow::Context;

use grocer_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    grocer_observability::init(AppConfig::log_format_from_env());

    let config = AppConfig::from_env();
    tracing::info!(
        store = ?config.store,
        stock_underflow = %config.stock_underflow.as_str(),
        "configuration loaded"
    );

    let services = grocer_api::app::services::build_services(&config).await?;
    let app = grocer_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
