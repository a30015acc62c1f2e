//! dotgit server binary.

use anyhow::Context;
use dotgit_server::{AppState, Settings, metrics, run_server_with_state};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("invalid DOTGIT_* settings")?;
    let addr = settings.addr().context("invalid host/port")?;

    tracing::info!("Starting dotgit server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Output root: {}", settings.output_root.display());
    tracing::info!("Workers: {}", settings.workers);
    if settings.tokens.is_empty() {
        tracing::warn!("No DOTGIT_TOKENS configured: every API request will be denied");
    }
    if settings.leaks_enabled {
        tracing::info!("Secret scanning with {}", settings.gitleaks_executable);
    }

    tokio::fs::create_dir_all(&settings.output_root)
        .await
        .with_context(|| format!("cannot create {}", settings.output_root.display()))?;

    let prometheus = metrics::init_metrics().context("failed to install metrics recorder")?;
    let state = AppState::new(settings);

    run_server_with_state(addr, state, prometheus).await?;
    Ok(())
}
