//! Arena Server - session coordinator for a shared multiplayer arena
//!
//! One arena per process. Browser clients connect over WebSocket, send
//! movement, shots and hit claims, and receive replicated peer state plus
//! round lifecycle events (countdown, timer, kills, round end).

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;

/// Serve the arena on an already bound listener until `shutdown` resolves.
///
/// Spawns the session coordinator; it stops once the router (and with it
/// every session handle) has been dropped.
pub async fn serve<F>(listener: TcpListener, config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (state, coordinator) = AppState::new(config);
    let coordinator = tokio::spawn(coordinator.run());

    let router = build_router(state);

    let addr = listener.local_addr()?;
    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    coordinator.abort();
    Ok(())
}
