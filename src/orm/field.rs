use crate::core::{StorageType, Value};
use std::fmt;

/// Default applied by `save` when a field has no value.
#[derive(Clone)]
pub enum FieldDefault {
    None,
    Value(Value),
    Factory(fn() -> Value),
}

impl FieldDefault {
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Value(value) => Some(value.clone()),
            Self::Factory(factory) => Some(factory()),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Value(value) => write!(f, "Value({value:?})"),
            Self::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Column definition of a persisted model.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub storage: StorageType,
    pub ddl: String,
    pub primary_key: bool,
    pub default: FieldDefault,
}

impl Field {
    fn new(name: &str, storage: StorageType, ddl: &str, default: FieldDefault) -> Self {
        Self {
            name: name.to_string(),
            storage,
            ddl: ddl.to_string(),
            primary_key: false,
            default,
        }
    }

    /// Short text, `varchar(100)` unless overridden with [`Field::ddl`].
    pub fn string(name: &str) -> Self {
        Self::new(name, StorageType::ShortText, "varchar(100)", FieldDefault::None)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(
            name,
            StorageType::Boolean,
            "boolean",
            FieldDefault::Value(Value::Boolean(false)),
        )
    }

    pub fn integer(name: &str) -> Self {
        Self::new(
            name,
            StorageType::Integer,
            "bigint",
            FieldDefault::Value(Value::Integer(0)),
        )
    }

    pub fn float(name: &str) -> Self {
        Self::new(
            name,
            StorageType::Real,
            "real",
            FieldDefault::Value(Value::Float(0.0)),
        )
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, StorageType::LongText, "text", FieldDefault::None)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn ddl(mut self, ddl: &str) -> Self {
        self.ddl = ddl.to_string();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn default_with(mut self, factory: fn() -> Value) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    /// Column definition for `create table`.
    pub fn column_ddl(&self) -> String {
        if self.primary_key {
            format!("`{}` {} not null", self.name, self.ddl)
        } else {
            format!("`{}` {}", self.name, self.ddl)
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}:{}>", self.storage, self.ddl, self.name)
    }
}
