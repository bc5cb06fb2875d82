//! Connection pool gateway.
//!
//! Owns the database connections and exposes the two primitives everything
//! else is built on: `query` (rows) and `execute` (affected-row count).

pub mod config;
pub mod pool;
pub mod record;

pub use config::PoolConfig;
pub use pool::{ConnectionPool, PoolGuard, PoolStats};
pub use record::Record;
