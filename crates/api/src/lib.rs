//! # Halaqa API
//!
//! The API crate provides the web server for managing study circles: users,
//! groups with their rosters and weekly schedules, sessions, attendance and
//! reports.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Validate input, consult the authorization gate, call the
//!   repositories
//! - **Middleware**: Authentication and error mapping
//! - **Config**: Environment configuration
//!
//! Handlers reach storage only through the repository traits of
//! `halaqa-db`, so they run unchanged against Postgres or test mocks.

/// Configuration module for API settings
pub mod config;
/// Request handlers that implement business logic
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, http::HeaderValue, response::Response};
use eyre::{Result, WrapErr};
use halaqa_core::errors::HalaqaError;
use halaqa_db::{DbPool, Repositories};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::middleware::{auth::AuthSettings, error_handling::map_error};

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    /// Storage, behind the repository traits
    pub repos: Repositories,
    /// Token signing settings
    pub auth: AuthSettings,
}

impl ApiState {
    pub fn new(repos: Repositories, auth: AuthSettings) -> Self {
        Self { repos, auth }
    }
}

async fn route_not_found() -> Response {
    map_error(HalaqaError::NotFound("Route not found".to_string()))
}

/// Builds the application router with every route attached to `state`.
///
/// Kept separate from [`start_server`] so tests can serve it in memory.
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Login and current user
        .merge(routes::auth::routes())
        // User management and own profile
        .merge(routes::users::routes())
        // Groups, rosters and group sessions
        .merge(routes::groups::routes())
        // Single sessions and attendance
        .merge(routes::sessions::routes())
        // Reports and dashboard
        .merge(routes::reports::routes())
        .fallback(route_not_found)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse()
                .wrap_err_with(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<HeaderValue>>>()?;

    Ok(CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .allow_origin(origins)
        .allow_credentials(true))
}

/// Starts the API server with the provided configuration and database connection
///
/// Sets up logging, wires the Postgres repositories into the shared state,
/// applies CORS, tracing and timeout layers, and serves until shutdown.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> eyre::Result<()> {
/// let config = halaqa_api::config::ApiConfig::from_env()?;
/// let db_pool = halaqa_db::create_pool(&config.database_url).await?;
/// halaqa_api::start_server(config, db_pool).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server(config: config::ApiConfig, db_pool: DbPool) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let state = Arc::new(ApiState::new(
        Repositories::postgres(db_pool),
        AuthSettings::new(config.jwt_secret.clone(), config.jwt_ttl_days),
    ));

    let app = build_router(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)?),
        None => app,
    };

    // Request tracing and timeout
    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
