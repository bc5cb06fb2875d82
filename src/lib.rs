//! Awesome blog.
//!
//! A small blog built from two reusable layers: an object mapper over a
//! pooled SQLite connection ([`orm`], [`db`]) and a request adapter that
//! binds HTTP requests to plain async handlers ([`web`]). The [`blog`]
//! module wires both into the application.
//!
//! ```no_run
//! use awesome_blog::blog::{self, AppState};
//! use awesome_blog::db::ConnectionPool;
//! use awesome_blog::web::FileTemplates;
//! use std::sync::Arc;
//!
//! # async fn run(config: awesome_blog::config::AppConfig) -> anyhow::Result<()> {
//! let db = blog::register_models(ConnectionPool::connect(config.pool_config()).await?)?;
//! db.create_tables().await?;
//!
//! let templates = Arc::new(FileTemplates::load(&config.templates_dir)?);
//! let app = blog::build_router(AppState::new(db, templates, config.settings()))?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod blog;
pub mod config;
pub mod core;
pub mod db;
pub mod orm;
pub mod web;

pub use crate::core::{DbError, Result, Value};
pub use crate::orm::{Database, Model};
