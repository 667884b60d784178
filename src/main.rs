//! tessera-server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints over the
//! configured data store.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tessera_server::app_state::AppState;
use tessera_server::auth::SessionKeys;
use tessera_server::config::{DataSourceKind, ServerConfig};
use tessera_server::domain::EventBus;
use tessera_server::payment::PaymentVerifier;
use tessera_server::store::memory::MemStore;
use tessera_server::store::postgres::PgStore;
use tessera_server::store::DataStore;
use tessera_server::ws::handler::ws_handler;
use tessera_server::api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting tessera-server");

    // Select the data store backend
    let store: Arc<dyn DataStore> = match config.data_source {
        DataSourceKind::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .acquire_timeout(std::time::Duration::from_secs(
                    config.database_connect_timeout_secs,
                ))
                .connect(&config.database_url)
                .await?;
            sqlx::migrate!().run(&pool).await?;
            tracing::info!("connected to postgres, migrations applied");
            Arc::new(PgStore::new(pool))
        }
        DataSourceKind::Fixture => {
            tracing::info!("running against the in-memory fixture store");
            Arc::new(MemStore::with_fixture())
        }
    };

    // Build shared state
    let event_bus = EventBus::new(config.event_bus_capacity);
    let sessions = SessionKeys::new(
        config.session_secret.as_bytes().to_vec(),
        Duration::minutes(config.session_ttl_minutes),
    );
    let payments = PaymentVerifier::new(config.payment_secret.as_bytes().to_vec());
    let app_state = AppState::new(store, sessions, payments, event_bus);

    // Build router
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Assembles the full application router.
fn build_app(app_state: AppState) -> Router {
    let router = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
