//! The blog application: models, session handling and routes.

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

use crate::core::DbError;
use crate::db::ConnectionPool;
use crate::orm::Database;
use crate::web::{ConfigurationError, RouteRegistry, log_request};
use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handlers::BlogHandlers;
pub use models::{Blog, Comment, User};
pub use state::{AppState, Settings};

/// Database with every blog model registered.
pub fn register_models(pool: ConnectionPool) -> Result<Database, DbError> {
    Ok(Database::builder(pool)
        .register::<User>()?
        .register::<Blog>()?
        .register::<Comment>()?
        .build())
}

/// Full application router.
///
/// Request order: trace, request log, session lookup, admin guard, handler.
pub fn build_router(state: AppState) -> Result<Router, ConfigurationError> {
    let mut registry = RouteRegistry::new();
    let count = registry.register_all(&BlogHandlers)?;
    info!(routes = count, "blog routes registered");

    let static_files = ServeDir::new(&state.settings.static_dir);
    Ok(registry
        .into_router()
        .nest_service("/static", static_files)
        .layer(from_fn(middleware::admin_guard))
        .layer(from_fn_with_state(state.clone(), middleware::auth))
        .layer(from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
