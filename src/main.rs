use anyhow::{Context, Result};
use redirect_guard::{
    config::AppConfig,
    server::{AppState, router},
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("redirect_guard=info,tower_http=info,axum=info")
            }),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = AppState::new(config);
    info!(
        "redirect policy: default {} disallow {:?}",
        state.config.default_redirect_path,
        state.policy.disallowed_paths()
    );

    let app = router(state.clone());
    let listener = TcpListener::bind(&state.config.http_bind_addr)
        .await
        .with_context(|| format!("failed binding {}", state.config.http_bind_addr))?;
    info!("listening on {}", state.config.http_bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
