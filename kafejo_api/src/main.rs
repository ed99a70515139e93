use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use kafejo_api::config::Args;
use kafejo_api::AppState;
use kafejo_oauth2::Authority;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let authority = Authority::new_from_url(args.jwks_url(), args.validator())
        .await
        .context("unable to fetch the initial JWKS")?;
    authority.spawn_refresh(Duration::from_secs(args.jwks_refresh_secs));

    let app = kafejo_api::router(AppState::new(), authority);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("unable to bind {}", args.bind))?;
    tracing::info!(bind = %args.bind, "kafejo-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("unable to install the shutdown handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
