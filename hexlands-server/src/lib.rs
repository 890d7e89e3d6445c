//! HEXLANDS Server - HTTP API for the rules engine
//!
//! This crate provides the web backend:
//! - REST API for game creation, commands and turn progression
//! - Idempotent mutation handling
//! - Manual save slots and autosave loading
//! - Optional static file serving for a client

mod routes;
mod state;

pub mod engine;
pub mod idempotency;
pub mod store;

use axum::{
    routing::{get, post, put},
    Router,
};
use hexlands_core::RulesConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, services::ServeDir};

pub use engine::GameService;
pub use state::ServerState;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<String>,
    /// How long a stored idempotent response is replayed
    pub idempotency_ttl: Duration,
    pub rules: RulesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8002,
            static_dir: None,
            idempotency_ttl: idempotency::DEFAULT_TTL,
            rules: RulesConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<String>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn with_idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.idempotency_ttl = ttl;
        self
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let router = Router::new()
        // Status endpoint
        .route("/api/status", get(routes::status::status_handler))
        // Unit catalog
        .route("/api/units", get(routes::units::get_units))
        // Games
        .route("/api/games", post(routes::games::create_game))
        .route("/api/games/:id", get(routes::games::get_game))
        .route("/api/games/:id/turns", get(routes::games::get_turns))
        .route(
            "/api/games/:id/units/:unit_id/preview",
            get(routes::games::unit_preview),
        )
        .route(
            "/api/games/:id/cities/:city_id/expansion",
            get(routes::games::expansion_preview),
        )
        // Commands
        .route("/api/games/:id/move", post(routes::games::move_unit))
        .route("/api/games/:id/attack-unit", post(routes::games::attack_unit))
        .route("/api/games/:id/attack-city", post(routes::games::attack_city))
        .route("/api/games/:id/spawn", post(routes::games::spawn_unit))
        .route("/api/games/:id/expand", post(routes::games::expand_territory))
        .route("/api/games/:id/end-turn", post(routes::games::end_turn))
        // Saves
        .route("/api/games/:id/saves", get(routes::saves::list_saves))
        .route(
            "/api/games/:id/saves/:slot",
            put(routes::saves::put_slot).delete(routes::saves::delete_slot),
        )
        .route(
            "/api/games/:id/saves/:slot/load",
            post(routes::saves::load_slot),
        )
        .route(
            "/api/games/:id/autosaves/:turn_no/load",
            post(routes::saves::load_autosave),
        )
        // Shared state
        .with_state(state)
        .layer(CorsLayer::permissive());

    // Static file serving (must be last)
    match &config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(ServerState::new(&config));
    let router = create_router(&config, state);

    tracing::info!("HEXLANDS Server starting on http://0.0.0.0:{}", config.port);
    if let Some(dir) = &config.static_dir {
        tracing::info!("Static files served from: {}", dir);
    }
    tracing::info!(
        "Idempotent responses kept for {}s",
        config.idempotency_ttl.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
