//! Liveness endpoint for the hosting platform.
//!
//! Always answers 200. Shares nothing with the bot; if it dies the bot keeps
//! polling.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const BODY: &str = "Bot ishlayapti";

pub fn router() -> Router {
    Router::new().route("/", get(alive)).route("/health", get(alive))
}

async fn alive() -> &'static str {
    BODY
}

/// Serve [`router`] on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    axum::serve(listener, router()).await
}

/// Bind `0.0.0.0:port` and serve in a background task.
pub async fn spawn(port: u16) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let addr = listener.local_addr()?;
    info!(port = addr.port(), "Health endpoint listening");

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener).await {
            warn!("Health endpoint stopped: {e}");
        }
    });
    Ok((addr, handle))
}
