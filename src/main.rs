use std::sync::Arc;

use anyhow::Context;
use authcode_session::{AuthFlow, Config, Provider, ReqwestClient, Session, server};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,authcode_session=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider = Provider::from_base_url(
        &config.issuer,
        config.client_id.clone(),
        Some(config.client_secret.clone()),
        config.redirect_uri(),
    )
    .context("deriving provider endpoints from issuer")?;

    let flow = Arc::new(AuthFlow::new(
        provider,
        Session::new(config.pkce),
        ReqwestClient::new(),
        config.scope_list(),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("binding {}", config.bind_addr()))?;

    info!(
        issuer = %config.issuer,
        redirect_uri = %config.redirect_uri(),
        pkce = config.pkce,
        "listening on http://localhost:{}/",
        config.port
    );

    axum::serve(listener, server::router(flow))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
