use std::sync::Arc;

use allin_core::{PlayerId, ServerMessage};
use axum::{Router, routing::get};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod registry;
mod session;

use config::ServerConfig;
use registry::TableRegistry;

/// Shared server state.
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<TableRegistry>,
    /// Every open socket, at a table or not. Used for lobby updates.
    pub lobby: DashMap<PlayerId, mpsc::Sender<ServerMessage>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> AppState {
        AppState {
            config,
            registry: Arc::new(TableRegistry::new()),
            lobby: DashMap::new(),
        }
    }
}

pub type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.bind;
    info!(
        next_hand_delay_ms = config.next_hand_delay.as_millis() as u64,
        seats = config.table_defaults.max_seats,
        "configuration loaded"
    );

    let state = SharedState::new(AppState::new(config));
    let app = Router::new()
        .route("/ws", get(session::websocket_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
