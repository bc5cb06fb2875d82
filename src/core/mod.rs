pub mod error;
pub mod value;

pub use error::{DbError, Result, SchemaError};
pub use value::{StorageType, Value};
