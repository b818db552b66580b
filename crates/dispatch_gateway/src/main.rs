use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dispatch_gateway::{app, config::Settings, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatch_gateway=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    let state = Arc::new(AppState::new(settings.engine_config()));

    // Drive the engine's timers (response timeouts, cancellation windows,
    // OTP sweeps) from wall-clock time.
    let ticker = state.clone();
    let tick_interval = Duration::from_millis(settings.server.tick_interval_ms.max(10));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        loop {
            interval.tick().await;
            ticker.tick();
        }
    });

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!("dispatch gateway listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
