//! Startup configuration for the benchmark server.
//!
//! Every knob that the handlers depend on lives here so that the router and
//! the row store are built from one explicit value instead of constants.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BenchError, BenchResult};

/// Size of the `World` key space: ids are drawn from `1..=ROW_DOMAIN_SIZE`.
pub const DEFAULT_ROW_DOMAIN_SIZE: i32 = 10_000;
/// Default connection pool capacity.
pub const DEFAULT_POOL_SIZE: usize = 256;
/// Ceiling applied to the `queries` parameter.
pub const DEFAULT_MAX_QUERIES: usize = 500;
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind: String,
    /// Port the listener binds to
    pub port: u16,
    /// Path of the SQLite database holding the `World` and `Fortune` tables
    pub database: PathBuf,
    /// Number of pooled connections
    pub pool_size: usize,
    /// Upper bound of the `World` id domain
    pub row_domain_size: i32,
    /// Upper clamp for fan-out requests
    pub max_queries: usize,
    /// How long a request may wait for a free connection
    pub acquire_timeout: Duration,
    /// Deadline for a single store round trip
    pub query_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            database: PathBuf::from("./hello_world.db"),
            pool_size: DEFAULT_POOL_SIZE,
            row_domain_size: DEFAULT_ROW_DOMAIN_SIZE,
            max_queries: DEFAULT_MAX_QUERIES,
            acquire_timeout: Duration::from_millis(DEFAULT_ACQUIRE_TIMEOUT_MS),
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    /// Reject configurations the server cannot honour.
    pub fn validate(&self) -> BenchResult<()> {
        if self.pool_size == 0 {
            return Err(BenchError::Config("pool size must be at least 1".into()));
        }
        if self.row_domain_size < 1 {
            return Err(BenchError::Config(format!(
                "row domain size must be positive, got {}",
                self.row_domain_size
            )));
        }
        if self.max_queries == 0 {
            return Err(BenchError::Config("max queries must be at least 1".into()));
        }
        if self.acquire_timeout.is_zero() || self.query_timeout.is_zero() {
            return Err(BenchError::Config("timeouts must be non-zero".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
