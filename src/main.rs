use watchlist_orchestrator::{config::Config, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;
    let (state, worker) = AppState::from_config(config)?;

    // Report both collections so the gateway and credentials can be checked end to end
    let watchlist = state.gateway.list_source().await?;
    let watched = state.gateway.list_target().await?;
    tracing::info!(
        watchlist = watchlist.len(),
        watched = watched.len(),
        "Connected to movie list API"
    );

    worker.shutdown().await;
    Ok(())
}
