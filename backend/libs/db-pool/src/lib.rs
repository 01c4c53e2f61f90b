//! Database connection pool management
//!
//! Provides MariaDB pool creation, verification, query timeouts and explicit
//! shutdown. Pools are plain owned values: callers create one pool per schema
//! at startup, hand clones to whoever needs them and close them on the way out.

mod env_utils;
mod metrics;

pub use env_utils::{parse_env_optional, parse_env_with_default};
pub use metrics::acquire_with_metrics;

use metrics::update_pool_metrics;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

/// Database connection pool configuration
#[derive(Clone)]
pub struct DbConfig {
    /// Pool name for metrics labeling and logs (e.g. "ventas", "finan")
    pub pool_name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Schema the pool connects to
    pub database: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Timeout for the post-connect verification query
    pub connect_timeout_secs: u64,
    /// Connection acquisition timeout (get connection from pool)
    pub acquire_timeout_secs: u64,
    /// Connection idle timeout
    pub idle_timeout_secs: u64,
    /// Connection maximum lifetime
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("pool_name", &self.pool_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            pool_name: String::from("unknown"),
            host: String::from("127.0.0.1"),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DbConfig {
    /// Build the config for one schema from `MARIADB_*` and `DB_*` variables
    ///
    /// All schemas share host and credentials; only the database differs.
    pub fn for_schema(pool_name: &str, database: &str) -> Self {
        let defaults = Self::default();

        Self {
            pool_name: pool_name.to_string(),
            host: parse_env_with_default("MARIADB_HOST", defaults.host),
            port: parse_env_with_default("MARIADB_PORT", defaults.port),
            user: parse_env_with_default("MARIADB_USER", defaults.user),
            password: parse_env_with_default("MARIADB_PASSWORD", defaults.password),
            database: database.to_string(),
            max_connections: parse_env_with_default("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_env_with_default("DB_MIN_CONNECTIONS", defaults.min_connections),
            connect_timeout_secs: parse_env_with_default(
                "DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            ),
            acquire_timeout_secs: parse_env_with_default(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout_secs,
            ),
            idle_timeout_secs: parse_env_with_default(
                "DB_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout_secs,
            ),
            max_lifetime_secs: parse_env_with_default(
                "DB_MAX_LIFETIME_SECS",
                defaults.max_lifetime_secs,
            ),
        }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// Log pool configuration details
    pub fn log_config(&self) {
        info!(
            pool = %self.pool_name,
            database = %self.database,
            "Database Pool Configuration: \
             max_connections={}, min_connections={}, \
             connect_timeout={}s, acquire_timeout={}s, idle_timeout={}s, max_lifetime={}s",
            self.max_connections,
            self.min_connections,
            self.connect_timeout_secs,
            self.acquire_timeout_secs,
            self.idle_timeout_secs,
            self.max_lifetime_secs
        );
    }
}

/// Error from a query run under [`with_query_timeout`]
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Run a database future with an upper bound on its duration
pub async fn with_query_timeout<F, T>(duration: Duration, future: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(QueryError::Database(e)),
        Err(_) => Err(QueryError::Timeout(duration)),
    }
}

/// Create a MariaDB connection pool with automatic metrics monitoring
pub async fn create_pool(config: DbConfig) -> Result<MySqlPool, sqlx::Error> {
    debug!(
        "Creating database pool: pool={}, database={}, max={}, min={}, \
         acquire_timeout={}s, verify_timeout={}s, idle_timeout={}s",
        config.pool_name,
        config.database,
        config.max_connections,
        config.min_connections,
        config.acquire_timeout_secs,
        config.connect_timeout_secs,
        config.idle_timeout_secs
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect_with(config.connect_options())
        .await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(
                pool = %config.pool_name,
                database = %config.database,
                "Database pool created and verified successfully"
            );

            update_pool_metrics(&pool, &config.pool_name);

            // Stops on its own once the pool is closed.
            {
                let pool_clone = pool.clone();
                let pool_name = config.pool_name.clone();
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(Duration::from_secs(30));
                    loop {
                        interval.tick().await;
                        if pool_clone.is_closed() {
                            debug!(pool = %pool_name, "Pool closed, stopping metrics updater");
                            break;
                        }
                        update_pool_metrics(&pool_clone, &pool_name);
                    }
                });
            }

            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(
                pool = %config.pool_name,
                error = %e,
                "Database connection verification failed"
            );
            pool.close().await;
            Err(e)
        }
        Err(_) => {
            error!(
                pool = %config.pool_name,
                timeout_secs = config.connect_timeout_secs,
                "Database connection verification timeout"
            );
            pool.close().await;
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Database verification timeout",
            )))
        }
    }
}

/// Close a pool, waiting for checked-out connections to be returned
pub async fn close_pool(pool: &MySqlPool, pool_name: &str) {
    if pool.is_closed() {
        return;
    }
    pool.close().await;
    info!(pool = %pool_name, "Database pool closed");
}
