//! HTTP server: routes, layers and the listener loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{convert, demo, health};
use crate::state::AppState;

/// Build the router. Demo routes exist only when demo mode is enabled.
pub fn create_router(state: Arc<AppState>, cors: bool) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health::handler))
        .route("/api/convert-prompt", post(convert::buffered))
        .route("/api/convert-prompt/stream", post(convert::stream));

    if state.demo.is_some() {
        router = router
            .route("/api/demo/generate-token", post(demo::generate_token))
            .route("/api/demo/usage", get(demo::usage))
            .route("/api/demo/convert-prompt", post(demo::convert));
    }

    let router = router.layer(TraceLayer::new_for_http());
    let router = if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// Serve until the process is stopped
pub async fn run_server(state: Arc<AppState>, host: &str, port: u16, cors: bool) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let app = create_router(state, cors);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("PromptJSON server listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
