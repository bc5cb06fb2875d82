//! Lightweight object mapping.
//!
//! A [`Model`] declares its table and [`Field`]s; registering it with a
//! [`Database`] compiles an [`EntitySchema`] whose statements are reused by
//! every `find`, `save`, `update` and `remove` call.

pub mod database;
pub mod field;
pub mod model;
pub mod schema;

pub use database::{Database, DatabaseBuilder, FindAll, Limit};
pub use field::{Field, FieldDefault};
pub use model::Model;
pub use schema::EntitySchema;
