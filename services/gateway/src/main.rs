use gateway::auth::JwtVerifier;
use gateway::config::Config;
use gateway::{AppState, create_router};
use ledger_store::MemoryLedger;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(config.log_level).init();

    tracing::info!(
        version = %config.version,
        local_routing_num = %config.local_routing,
        "Starting ledger gateway"
    );

    let verifier = JwtVerifier::from_key(&config.auth_key)?;
    let store = Arc::new(MemoryLedger::new());
    let port = config.port;
    let poll_interval = config.poll_interval;
    let state = AppState::new(config, store, verifier)?;

    // Ledger poller, fixed delay between ticks
    state.reader.clone().spawn(poll_interval);

    // Forget idempotency tokens once their window has passed
    let writer = state.writer.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            writer.guard().purge_expired();
        }
    });

    let app = create_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
