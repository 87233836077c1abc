use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use pricewatch_core::config::ServerSettings;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::connection;
use crate::session::SessionDispatcher;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<SessionDispatcher>,
    pub settings: Arc<ServerSettings>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let ws_path = state.settings.path.clone();
    Router::new()
        .route(&ws_path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Port 0 picks an ephemeral port.
pub async fn start(
    settings: ServerSettings,
    dispatcher: Arc<SessionDispatcher>,
) -> Result<ServerHandle, std::io::Error> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let path = settings.path.clone();

    let state = AppState {
        dispatcher,
        settings: Arc::new(settings),
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, path = %path, "Pricewatch server started");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Server stopped");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server: server_handle,
    })
}

/// Handle returned by `start()`; keeps the serve task alive.
pub struct ServerHandle {
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections.
    pub fn shutdown(&self) {
        self.server.abort();
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    connection::handle_ws_connection(socket, state.dispatcher, state.settings).await;
}

async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
