//! Server assembly and startup.

use std::sync::Arc;

use {
    axum::{Router, routing::get},
    sqlx::SqlitePool,
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use {
    nexus_config::NexusConfig,
    nexus_directory::{Directory, SqliteDirectory},
    nexus_voice::{LiveKitIssuer, VoiceService},
};

use crate::routes;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub voice: Arc<VoiceService>,
    pub directory: Arc<dyn Directory>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state)
}

/// Open the database, create schemas, wire services, and serve until
/// shutdown.
pub async fn start_server(config: &NexusConfig) -> anyhow::Result<()> {
    let pool = SqlitePool::connect(&config.database.url).await?;
    nexus_voice::init_schema(&pool).await?;
    SqliteDirectory::init(&pool).await?;

    let issuer = Arc::new(LiveKitIssuer::from_config(&config.livekit));
    if !config.livekit.is_configured() {
        warn!("LiveKit credentials not set; voice channels are visible but joins are disabled");
    }

    let state = AppState {
        voice: Arc::new(VoiceService::new(pool.clone(), issuer)),
        directory: Arc::new(SqliteDirectory::new(pool)),
    };
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "nexus gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> &'static str {
    "ok"
}
