use super::config::PoolConfig;
use super::record::Record;
use crate::core::{DbError, Result, Value};
use futures::{StreamExt, TryStreamExt};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Connection pool
///
/// The single shared resource of the application: every model lookup and
/// every write goes through one of these. Cloning is cheap and clones share
/// the same underlying connections.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: SqlitePool,
    config: PoolConfig,
}

impl ConnectionPool {
    /// Open a pool for the configured database
    pub async fn connect(config: PoolConfig) -> Result<Self> {
        config.validate().map_err(DbError::Config)?;
        info!(url = %config.url, max = config.max_connections, "creating database connection pool");

        let options =
            SqliteConnectOptions::from_str(&config.url)?.create_if_missing(config.create_if_missing);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(options)
            .await?;

        Ok(Self { pool, config })
    }

    /// Open a private in-memory database, mostly useful for tests
    pub async fn in_memory() -> Result<Self> {
        Self::connect(PoolConfig::in_memory()).await
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Check a connection out of the pool.
    ///
    /// The connection goes back to the pool when the guard is dropped, on
    /// every exit path.
    pub async fn acquire(&self) -> Result<PoolGuard> {
        let connection = self.pool.acquire().await?;
        Ok(PoolGuard { connection })
    }

    /// Run a row-returning statement and decode every row into a [`Record`].
    ///
    /// With `row_limit` set, reading stops after that many rows.
    pub async fn query(
        &self,
        sql: &str,
        args: &[Value],
        row_limit: Option<usize>,
    ) -> Result<Vec<Record>> {
        info!(sql, args = args.len(), "SQL");
        let mut conn = self.acquire().await?;

        let rows: Vec<SqliteRow> = match row_limit {
            Some(limit) => {
                bind_values(sqlx::query(sql), args)
                    .fetch(&mut *conn)
                    .take(limit)
                    .try_collect::<Vec<_>>()
                    .await?
            }
            None => bind_values(sqlx::query(sql), args).fetch_all(&mut *conn).await?,
        };

        let records = rows
            .iter()
            .map(Record::from_row)
            .collect::<Result<Vec<_>>>()?;
        info!(rows = records.len(), "rows returned");
        Ok(records)
    }

    /// Run a write statement and return the number of affected rows.
    ///
    /// With `auto_commit == false` the statement runs in its own transaction;
    /// a failure rolls it back before the error is returned.
    pub async fn execute(&self, sql: &str, args: &[Value], auto_commit: bool) -> Result<u64> {
        info!(sql, args = args.len(), "SQL");

        if auto_commit {
            let mut conn = self.acquire().await?;
            let done = bind_values(sqlx::query(sql), args)
                .execute(&mut *conn)
                .await?;
            return Ok(done.rows_affected());
        }

        let mut tx = self.pool.begin().await?;
        match bind_values(sqlx::query(sql), args).execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err.into())
            }
        }
    }

    /// Run a batch of schema statements (no arguments), e.g. DDL at startup.
    pub async fn execute_script(&self, sql: &str) -> Result<()> {
        info!(sql, "SQL script");
        let mut conn = self.acquire().await?;
        sqlx::raw_sql(sql).execute(&mut *conn).await?;
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        let total = self.pool.size() as usize;
        let idle = self.pool.num_idle();
        PoolStats {
            total_connections: total,
            idle_connections: idle,
            active_connections: total.saturating_sub(idle),
            max_connections: self.config.max_connections as usize,
        }
    }

    pub async fn close(&self) {
        debug!("closing database connection pool");
        self.pool.close().await;
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(Option::<String>::None),
            Value::Integer(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Boolean(b) => query.bind(*b),
        };
    }
    query
}

/// Connection pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_connections: usize,
    pub idle_connections: usize,
    pub active_connections: usize,
    pub max_connections: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool Stats: {}/{} active, {} idle, max {}",
            self.active_connections,
            self.total_connections,
            self.idle_connections,
            self.max_connections
        )
    }
}

/// RAII guard for pooled connections
///
/// Returns the connection to the pool when dropped
pub struct PoolGuard {
    connection: PoolConnection<Sqlite>,
}

impl Deref for PoolGuard {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for PoolGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_with_table() -> ConnectionPool {
        let pool = ConnectionPool::in_memory().await.unwrap();
        pool.execute_script("create table `t` (`id` varchar(50) not null, `n` bigint, primary key (`id`))")
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_execute_and_query() {
        let pool = pool_with_table().await;

        let affected = pool
            .execute(
                "insert into `t` (`n`, `id`) values (?, ?)",
                &[Value::Integer(7), Value::from("a")],
                true,
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = pool
            .query("select `id`, `n` from `t`", &[], None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::from("a")));
        assert_eq!(rows[0].get("n"), Some(&Value::Integer(7)));
    }

    #[tokio::test]
    async fn test_query_row_limit() {
        let pool = pool_with_table().await;
        for id in ["a", "b", "c"] {
            pool.execute(
                "insert into `t` (`n`, `id`) values (?, ?)",
                &[Value::Integer(1), Value::from(id)],
                true,
            )
            .await
            .unwrap();
        }

        let rows = pool
            .query("select `id` from `t`", &[], Some(2))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let pool = pool_with_table().await;
        pool.execute(
            "insert into `t` (`n`, `id`) values (?, ?)",
            &[Value::Integer(1), Value::from("dup")],
            false,
        )
        .await
        .unwrap();

        let err = pool
            .execute(
                "insert into `t` (`n`, `id`) values (?, ?)",
                &[Value::Integer(2), Value::from("dup")],
                false,
            )
            .await;
        assert!(matches!(err, Err(DbError::Driver(_))));

        let rows = pool
            .query("select `n` from `t` where `id`=?", &[Value::from("dup")], None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("n"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn test_pool_stats() {
        let pool = ConnectionPool::in_memory().await.unwrap();
        let stats = pool.stats();
        assert_eq!(stats.max_connections, 1);
        assert!(stats.total_connections <= 1);
    }
}
