use super::model::{Model, field_value, from_field_map, from_record, to_field_map};
use super::schema::EntitySchema;
use crate::core::{DbError, Result, Value};
use crate::db::ConnectionPool;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Row limit of a `find_all` query: either a count, or an (offset, count) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(i64),
    Range(i64, i64),
}

impl TryFrom<&[i64]> for Limit {
    type Error = DbError;

    fn try_from(spec: &[i64]) -> Result<Self> {
        match *spec {
            [count] => Ok(Self::Count(count)),
            [offset, count] => Ok(Self::Range(offset, count)),
            _ => Err(DbError::InvalidArgument(format!(
                "Invalid limit value: {:?}",
                spec
            ))),
        }
    }
}

/// Options of [`Database::find_all`].
#[derive(Debug, Clone, Default)]
pub struct FindAll {
    filter: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindAll {
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL `where` clause (without the keyword) and its positional arguments.
    pub fn filter(mut self, clause: &str, args: Vec<Value>) -> Self {
        self.filter = Some(clause.to_string());
        self.args = args;
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Limit given as a slice of one or two integers.
    pub fn limit_spec(self, spec: &[i64]) -> Result<Self> {
        Ok(self.limit(Limit::try_from(spec)?))
    }
}

/// Registered model schemas plus the pool they are persisted through.
///
/// Handlers never build SQL for the plain CRUD paths: every statement comes
/// from the [`EntitySchema`] compiled when the model was registered.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
    schemas: Arc<Vec<Arc<EntitySchema>>>,
    by_type: Arc<HashMap<TypeId, usize>>,
}

pub struct DatabaseBuilder {
    pool: ConnectionPool,
    schemas: Vec<Arc<EntitySchema>>,
    by_type: HashMap<TypeId, usize>,
}

impl DatabaseBuilder {
    /// Compile and register the schema of `M`.
    pub fn register<M: Model>(mut self) -> Result<Self> {
        let schema = EntitySchema::build(M::TABLE, M::fields())?;
        info!(
            model = std::any::type_name::<M>(),
            table = schema.table(),
            "found model"
        );
        for field in schema.all_fields() {
            if field.primary_key {
                info!("  found mapping: {} ==> {} (primary key)", field.name, field);
            } else {
                info!("  found mapping: {} ==> {}", field.name, field);
            }
        }

        let index = self.schemas.len();
        self.schemas.push(Arc::new(schema));
        self.by_type.insert(TypeId::of::<M>(), index);
        Ok(self)
    }

    pub fn build(self) -> Database {
        Database {
            pool: self.pool,
            schemas: Arc::new(self.schemas),
            by_type: Arc::new(self.by_type),
        }
    }
}

impl Database {
    pub fn builder(pool: ConnectionPool) -> DatabaseBuilder {
        DatabaseBuilder {
            pool,
            schemas: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Registered schemas, in registration order.
    pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.iter().map(|schema| schema.as_ref())
    }

    pub fn schema<M: Model>(&self) -> Result<&EntitySchema> {
        self.by_type
            .get(&TypeId::of::<M>())
            .map(|&index| self.schemas[index].as_ref())
            .ok_or(DbError::UnregisteredModel(M::TABLE))
    }

    /// Create every registered table that does not exist yet.
    pub async fn create_tables(&self) -> Result<()> {
        for schema in self.schemas() {
            self.pool.execute_script(&schema.create_table()).await?;
        }
        Ok(())
    }

    /// Find a model by primary key.
    pub async fn find<M: Model>(&self, pk: impl Into<Value>) -> Result<Option<M>> {
        let schema = self.schema::<M>()?;
        let sql = format!(
            "{} where `{}`=?",
            schema.select_sql(),
            schema.primary_key().name
        );
        let mut rows = self.pool.query(&sql, &[pk.into()], Some(1)).await?;
        match rows.pop() {
            Some(record) => Ok(Some(from_record(schema, record)?)),
            None => Ok(None),
        }
    }

    /// Find models by an optional where clause, ordering and limit.
    pub async fn find_all<M: Model>(&self, options: FindAll) -> Result<Vec<M>> {
        let schema = self.schema::<M>()?;
        let mut sql = schema.select_sql().to_string();
        let mut args = options.args;

        if let Some(filter) = &options.filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        if let Some(order_by) = &options.order_by {
            sql.push_str(" order by ");
            sql.push_str(order_by);
        }
        match options.limit {
            Some(Limit::Count(count)) => {
                sql.push_str(" limit ?");
                args.push(Value::Integer(count));
            }
            Some(Limit::Range(offset, count)) => {
                sql.push_str(" limit ?, ?");
                args.push(Value::Integer(offset));
                args.push(Value::Integer(count));
            }
            None => {}
        }

        self.pool
            .query(&sql, &args, None)
            .await?
            .into_iter()
            .map(|record| from_record(schema, record))
            .collect()
    }

    /// Evaluate an aggregate expression (e.g. `count(id)`) over the table.
    ///
    /// Returns `None` when the query produced no row.
    pub async fn count<M: Model>(
        &self,
        expr: &str,
        filter: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let schema = self.schema::<M>()?;
        let mut sql = format!("select {} _num_ from `{}`", expr, schema.table());
        if let Some(filter) = filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        let rows = self.pool.query(&sql, args, Some(1)).await?;
        Ok(rows.first().and_then(|record| record.get("_num_").cloned()))
    }

    /// Insert a model.
    ///
    /// Fields without a value take their declared default, and the resolved
    /// defaults are written back into `instance`.
    pub async fn save<M: Model>(&self, instance: &mut M) -> Result<()> {
        let schema = self.schema::<M>()?;
        let mut map = to_field_map(instance)?;
        let mut args = Vec::with_capacity(schema.fields().len() + 1);

        for field in schema
            .fields()
            .iter()
            .chain(std::iter::once(schema.primary_key()))
        {
            let mut value = field_value(field, &map);
            if value.is_null() {
                if let Some(default) = field.default.resolve() {
                    debug!(field = %field.name, value = %default, "using default value");
                    map.insert(field.name.clone(), default.to_json());
                    value = default;
                }
            }
            args.push(value);
        }

        let rows = self.pool.execute(schema.insert_sql(), &args, true).await?;
        if rows != 1 {
            warn!(table = schema.table(), rows, "failed to insert record: affected rows");
        }
        *instance = from_field_map(map)?;
        Ok(())
    }

    /// Write every non-key field of a model back by primary key.
    pub async fn update<M: Model>(&self, instance: &M) -> Result<()> {
        let schema = self.schema::<M>()?;
        let map = to_field_map(instance)?;
        let args: Vec<Value> = schema
            .fields()
            .iter()
            .chain(std::iter::once(schema.primary_key()))
            .map(|field| field_value(field, &map))
            .collect();

        let rows = self.pool.execute(schema.update_sql(), &args, true).await?;
        if rows != 1 {
            warn!(table = schema.table(), rows, "failed to update by primary key: affected rows");
        }
        Ok(())
    }

    /// Delete a model by primary key.
    pub async fn remove<M: Model>(&self, instance: &M) -> Result<()> {
        let schema = self.schema::<M>()?;
        let map = to_field_map(instance)?;
        let args = [field_value(schema.primary_key(), &map)];

        let rows = self.pool.execute(schema.delete_sql(), &args, true).await?;
        if rows != 1 {
            warn!(table = schema.table(), rows, "failed to remove by primary key: affected rows");
        }
        Ok(())
    }
}
