use slotcoin_server::{app, AppState, ServerConfig, SpinCoordinator, SqliteProfileStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env()?;
    let store = Arc::new(SqliteProfileStore::connect(&config.database_url).await?);
    let identity = config.identity_provider()?;

    let coordinator = SpinCoordinator::new(&config.game, identity, store)?
        .with_call_timeout(config.call_timeout)
        .with_max_attempts(config.max_attempts);
    info!(
        spin_cost = config.game.spin_cost,
        symbols = config.game.symbols.len(),
        expected_return = coordinator.engine().expected_return(config.game.spin_cost),
        "game loaded"
    );

    let state = Arc::new(AppState {
        coordinator,
        game: config.game.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
