use crate::blog::Settings;
use crate::blog::auth::SessionKeys;
use crate::db::PoolConfig;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration.
///
/// Built-in defaults, overridden by environment variables (a `.env` file is
/// loaded first), overridden by command-line flags.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    #[arg(long, env = "APP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "APP_PORT", default_value_t = 9000)]
    pub port: u16,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://awesome.db")]
    pub database_url: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    #[arg(long, env = "DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub db_min_connections: u32,

    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 30)]
    pub db_acquire_timeout_secs: u64,

    #[arg(long, env = "SESSION_SECRET", default_value = "AwEsOmE", hide_env_values = true)]
    pub session_secret: String,

    #[arg(long, env = "SESSION_MAX_AGE_SECS", default_value_t = 86400)]
    pub session_max_age_secs: i64,

    /// bcrypt cost for stored passwords
    #[arg(long, env = "PASSWORD_COST", default_value_t = 10)]
    pub password_cost: u32,

    #[arg(long, env = "TEMPLATES_DIR", default_value = "templates")]
    pub templates_dir: PathBuf,

    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(&self.database_url)
            .max_connections(self.db_max_connections)
            .min_connections(self.db_min_connections)
            .acquire_timeout(Duration::from_secs(self.db_acquire_timeout_secs))
    }

    pub fn settings(&self) -> Settings {
        Settings {
            session: SessionKeys::new(&self.session_secret, self.session_max_age_secs),
            password_cost: self.password_cost,
            static_dir: self.static_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: AppConfig,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from(["awesome-blog", "--port", "8080", "--password-cost", "4"])
            .unwrap();
        assert_eq!(cli.config.port, 8080);
        assert_eq!(cli.config.password_cost, 4);

        let settings = cli.config.settings();
        assert_eq!(settings.password_cost, 4);
        assert_eq!(settings.session.max_age, cli.config.session_max_age_secs);
    }

    #[test]
    fn test_pool_config_from_options() {
        let cli = Cli::try_parse_from([
            "awesome-blog",
            "--database-url",
            "sqlite://test.db",
            "--db-max-connections",
            "3",
        ])
        .unwrap();
        let pool = cli.config.pool_config();
        assert_eq!(pool.url, "sqlite://test.db");
        assert_eq!(pool.max_connections, 3);
        assert!(pool.validate().is_ok());
    }
}
