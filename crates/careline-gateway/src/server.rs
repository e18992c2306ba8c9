//! Axum server bootstrap for both services.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;

/// Start the therapy service (HTTP + WS).
pub async fn start_therapy(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    serve("therapy", crate::therapy::router(state.clone()), &state, port).await
}

/// Start the clinic service.
pub async fn start_clinic(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    serve("clinic", crate::clinic::router(state.clone()), &state, port).await
}

async fn serve(service: &str, router: Router, state: &AppState, port: u16) -> anyhow::Result<()> {
    let app = router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{port}", state.config.bind_addr());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(service, "Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("Shutdown signal received");
}
