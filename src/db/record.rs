use crate::core::{Result, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// One result row: column names in select order, each with its decoded value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a driver row using the runtime type of every cell.
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let mut record = Self::new();
        for (idx, column) in row.columns().iter().enumerate() {
            record.push(column.name(), decode_cell(row, idx)?);
        }
        Ok(record)
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

fn decode_cell(row: &SqliteRow, idx: usize) -> Result<Value> {
    let type_name = {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" => Value::Float(row.try_get_unchecked::<f64, _>(idx)?),
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::Text(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}
