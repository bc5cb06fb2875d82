use thiserror::Error;

/// Failures raised while compiling an entity schema at registration time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate primary key for field: {field} (table '{table}')")]
    DuplicatePrimaryKey { table: String, field: String },

    #[error("Primary key not found (table '{0}')")]
    MissingPrimaryKey(String),

    #[error("Duplicate field '{field}' in table '{table}'")]
    DuplicateField { table: String, field: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Driver(#[from] sqlx::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Model '{0}' is not registered")]
    UnregisteredModel(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
