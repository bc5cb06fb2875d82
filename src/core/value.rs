use std::fmt;

use serde_json::{Number, Value as JsonValue};

/// A single column value as it travels between models, SQL arguments and rows.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts a JSON value into a column value of the given storage type.
    ///
    /// JSON `null` always maps to [`Value::Null`]. Values of a different JSON
    /// type are coerced where it is lossless enough for the column (numbers into
    /// text columns are stored as their decimal form, `"1"` into an integer
    /// column parses); anything else is stored as text.
    pub fn from_json(json: &JsonValue, storage: StorageType) -> Self {
        match (storage, json) {
            (_, JsonValue::Null) => Self::Null,
            (StorageType::Boolean, JsonValue::Bool(b)) => Self::Boolean(*b),
            (StorageType::Boolean, JsonValue::Number(n)) => {
                Self::Boolean(n.as_f64().is_some_and(|f| f != 0.0))
            }
            (StorageType::Integer, JsonValue::Number(n)) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map_or(Self::Null, |f| Self::Integer(f as i64)),
            },
            (StorageType::Integer, JsonValue::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_or_else(|_| Self::Text(s.clone()), Self::Integer),
            (StorageType::Real, JsonValue::Number(n)) => {
                n.as_f64().map_or(Self::Null, Self::Float)
            }
            (StorageType::Real, JsonValue::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_or_else(|_| Self::Text(s.clone()), Self::Float),
            (_, JsonValue::String(s)) => Self::Text(s.clone()),
            (_, JsonValue::Bool(b)) => Self::Boolean(*b),
            (_, JsonValue::Number(n)) => match n.as_i64() {
                Some(i) if !storage.is_text() => Self::Integer(i),
                _ => Self::Text(n.to_string()),
            },
            (_, other) => Self::Text(other.to_string()),
        }
    }

    /// Normalizes a value read back from the database to the column's storage
    /// type (SQLite hands booleans back as integers).
    pub fn coerce(self, storage: StorageType) -> Self {
        match (storage, self) {
            (StorageType::Boolean, Self::Integer(i)) => Self::Boolean(i != 0),
            (StorageType::Real, Self::Integer(i)) => Self::Float(i as f64),
            (StorageType::Integer, Self::Float(f)) if f.fract() == 0.0 => Self::Integer(f as i64),
            (_, value) => value,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Integer(i) => JsonValue::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Boolean(b) => JsonValue::Bool(*b),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Storage class of a persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    ShortText,
    LongText,
    Boolean,
    Integer,
    Real,
}

impl StorageType {
    pub fn is_text(&self) -> bool {
        matches!(self, Self::ShortText | Self::LongText)
    }

    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Real, Value::Float(_)) => true,
            (Self::Real, Value::Integer(_)) => true,
            (Self::ShortText | Self::LongText, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortText => write!(f, "SHORT TEXT"),
            Self::LongText => write!(f, "LONG TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Integer => write!(f, "INTEGER"),
            Self::Real => write!(f, "REAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Float(3.5), Value::Float(3.5));
        assert_eq!(Value::Integer(2), Value::Float(2.0));
        assert_ne!(Value::Integer(1), Value::Integer(2));
        assert_ne!(Value::Text("1".into()), Value::Integer(1));
    }

    #[test]
    fn test_from_json_follows_storage_type() {
        assert_eq!(
            Value::from_json(&json!(true), StorageType::Boolean),
            Value::Boolean(true)
        );
        assert_eq!(
            Value::from_json(&json!(1), StorageType::Boolean),
            Value::Boolean(true)
        );
        assert_eq!(
            Value::from_json(&json!(12), StorageType::Real),
            Value::Float(12.0)
        );
        assert_eq!(
            Value::from_json(&json!("7"), StorageType::Integer),
            Value::Integer(7)
        );
        assert_eq!(
            Value::from_json(&json!(42), StorageType::ShortText),
            Value::Text("42".into())
        );
        assert!(Value::from_json(&json!(null), StorageType::LongText).is_null());
    }

    #[test]
    fn test_coerce_database_values() {
        assert_eq!(
            Value::Integer(1).coerce(StorageType::Boolean),
            Value::Boolean(true)
        );
        assert_eq!(
            Value::Integer(5).coerce(StorageType::Real),
            Value::Float(5.0)
        );
        assert_eq!(
            Value::Text("x".into()).coerce(StorageType::Integer),
            Value::Text("x".into())
        );
    }

    #[test]
    fn test_to_json_drops_non_finite_floats() {
        assert_eq!(Value::Float(f64::NAN).to_json(), JsonValue::Null);
        assert_eq!(Value::Integer(3).to_json(), json!(3));
        assert_eq!(Value::Text("x".into()).to_json(), json!("x"));
    }

    #[test]
    fn test_storage_compatibility() {
        assert!(StorageType::Real.is_compatible(&Value::Integer(1)));
        assert!(StorageType::Integer.is_compatible(&Value::Null));
        assert!(!StorageType::Integer.is_compatible(&Value::Text("a".into())));
    }
}
