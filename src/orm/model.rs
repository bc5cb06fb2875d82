use super::field::Field;
use super::schema::EntitySchema;
use crate::core::{DbError, Result, Value};
use crate::db::Record;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::warn;

/// A persisted record type.
///
/// Implementors are plain serde structs; the mapper moves values between
/// the struct and the table through the declared [`Field`]s. Fields that
/// may be filled by a default at save time are usually `Option`s so that
/// "not set yet" serializes as `null`.
///
/// ```
/// use awesome_blog::orm::{Field, Model};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Tag {
///     id: Option<String>,
///     label: String,
/// }
///
/// impl Model for Tag {
///     const TABLE: &'static str = "tags";
///
///     fn fields() -> Vec<Field> {
///         vec![Field::string("id").primary_key(), Field::string("label")]
///     }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;

    fn fields() -> Vec<Field>;
}

/// Serialize a model into its field map.
pub(crate) fn to_field_map<M: Model>(instance: &M) -> Result<JsonMap<String, JsonValue>> {
    match serde_json::to_value(instance)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(DbError::Decode(format!(
            "model '{}' must serialize to an object, got {}",
            M::TABLE,
            other
        ))),
    }
}

/// Value of one column, read from a serialized model.
pub(crate) fn field_value(field: &Field, map: &JsonMap<String, JsonValue>) -> Value {
    map.get(&field.name)
        .map(|json| Value::from_json(json, field.storage))
        .unwrap_or(Value::Null)
}

/// Build a model from a row read with the schema's select statement.
///
/// NULL columns are left out so `#[serde(default)]` fields fall back to
/// their Rust default instead of failing to deserialize.
pub(crate) fn from_record<M: Model>(schema: &EntitySchema, record: Record) -> Result<M> {
    let mut map = JsonMap::new();
    for (name, value) in record.iter() {
        let value = match schema.field(name) {
            Some(field) => {
                let value = value.clone().coerce(field.storage);
                if !field.storage.is_compatible(&value) {
                    warn!(
                        table = schema.table(),
                        column = name,
                        found = value.type_name(),
                        "column value does not match declared storage type"
                    );
                }
                value
            }
            None => value.clone(),
        };
        if !value.is_null() {
            map.insert(name.to_string(), value.to_json());
        }
    }
    Ok(serde_json::from_value(JsonValue::Object(map))?)
}

pub(crate) fn from_field_map<M: Model>(map: JsonMap<String, JsonValue>) -> Result<M> {
    let map = map.into_iter().filter(|(_, value)| !value.is_null()).collect();
    Ok(serde_json::from_value(JsonValue::Object(map))?)
}
