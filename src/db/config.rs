use std::time::Duration;

/// Database pool configuration
///
/// Built with the same builder style for file-backed and in-memory databases:
///
/// ```
/// use awesome_blog::db::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new("sqlite://awesome.db")
///     .max_connections(20)
///     .acquire_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connection URL, e.g. `sqlite://awesome.db` or `sqlite::memory:`
    pub url: String,

    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Minimum number of connections in pool
    pub min_connections: u32,

    /// How long `acquire()` waits for a free connection
    pub acquire_timeout: Duration,

    /// Connection idle timeout
    pub idle_timeout: Option<Duration>,

    /// Maximum connection lifetime
    pub max_lifetime: Option<Duration>,
}

impl PoolConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            create_if_missing: true,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }

    /// Private in-memory database.
    ///
    /// SQLite gives every connection its own memory database, so the pool is
    /// pinned to a single connection that never expires.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            create_if_missing: false,
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: None,
            max_lifetime: None,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("database url cannot be empty".to_string());
        }

        if !self.url.starts_with("sqlite:") {
            return Err("database url must start with 'sqlite:'".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }

        if self.min_connections > self.max_connections {
            return Err("min_connections cannot exceed max_connections".to_string());
        }

        if self.is_memory() && self.max_connections > 1 {
            return Err("in-memory databases must use a single connection".to_string());
        }

        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new("sqlite://awesome.db")
    }
}
