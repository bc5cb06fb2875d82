use super::field::Field;
use crate::core::SchemaError;
use std::collections::HashSet;

/// Compiled description of a persisted model.
///
/// Built once per model type at registration; the four statement templates
/// are rendered here so no SQL text is assembled per call.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    table: String,
    primary_key: Field,
    fields: Vec<Field>,
    select: String,
    insert: String,
    update: String,
    delete: String,
}

impl EntitySchema {
    /// Compile a schema from declared fields.
    ///
    /// Exactly one field must be flagged as primary key; field order is kept.
    pub fn build(table: &str, declared: Vec<Field>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut primary_key: Option<Field> = None;
        let mut fields = Vec::with_capacity(declared.len());

        for field in declared {
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateField {
                    table: table.to_string(),
                    field: field.name,
                });
            }
            if field.primary_key {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        table: table.to_string(),
                        field: field.name,
                    });
                }
                primary_key = Some(field);
            } else {
                fields.push(field);
            }
        }

        let primary_key =
            primary_key.ok_or_else(|| SchemaError::MissingPrimaryKey(table.to_string()))?;

        let escaped: Vec<String> = fields.iter().map(|f| format!("`{}`", f.name)).collect();
        let pk = &primary_key.name;

        let select = if escaped.is_empty() {
            format!("select `{pk}` from `{table}`")
        } else {
            format!("select `{pk}`, {} from `{table}`", escaped.join(", "))
        };

        let insert_columns = escaped
            .iter()
            .cloned()
            .chain(std::iter::once(format!("`{pk}`")))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!(
            "insert into `{table}` ({insert_columns}) values ({})",
            placeholders(escaped.len() + 1)
        );

        // A key-only table has nothing to set; the statement still binds just the key.
        let assignments = if escaped.is_empty() {
            format!("`{pk}`=`{pk}`")
        } else {
            escaped
                .iter()
                .map(|column| format!("{column}=?"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let update = format!("update `{table}` set {assignments} where `{pk}`=?");

        let delete = format!("delete from `{table}` where `{pk}`=?");

        Ok(Self {
            table: table.to_string(),
            primary_key,
            fields,
            select,
            insert,
            update,
            delete,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &Field {
        &self.primary_key
    }

    /// Non-primary-key fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Primary key first, then the other fields: the select column order.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        std::iter::once(&self.primary_key).chain(self.fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.all_fields().find(|field| field.name == name)
    }

    pub fn select_sql(&self) -> &str {
        &self.select
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert
    }

    pub fn update_sql(&self) -> &str {
        &self.update
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete
    }

    pub fn create_table(&self) -> String {
        let columns = self
            .all_fields()
            .map(|field| format!("    {}", field.column_ddl()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "create table if not exists `{}` (\n{},\n    primary key (`{}`)\n);",
            self.table, columns, self.primary_key.name
        )
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
