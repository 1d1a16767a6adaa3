//! Row store handle
//!
//! [`RowStore`] owns the connection pool and the three statements the
//! benchmark runs. Statements live in each connection's statement cache and
//! are prepared once per connection when the pool opens, so a missing table
//! or a typo in the SQL stops the server at startup instead of on the first
//! request.

pub mod model;
pub mod pool;
pub mod seed;

pub use model::{Fortune, World};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{BenchError, BenchResult};

pub const WORLD_SELECT: &str = "SELECT id, randomNumber FROM World WHERE id = ?1";
pub const WORLD_UPDATE: &str = "UPDATE World SET randomNumber = ?1 WHERE id = ?2";
pub const FORTUNE_SELECT: &str = "SELECT id, message FROM Fortune";

/// Shared handle to the benchmark tables.
#[derive(Clone)]
pub struct RowStore {
    pool: ConnectionPool,
    query_timeout: Duration,
    counters: Arc<StoreCounters>,
}

/// Running totals exported on `/metrics`
#[derive(Debug, Default)]
pub struct StoreCounters {
    pub rows_read: AtomicU64,
    pub rows_updated: AtomicU64,
    pub fortune_reads: AtomicU64,
}

impl RowStore {
    /// Open the pool described by `config` and prepare every statement on
    /// every connection.
    pub fn open(config: &ServerConfig) -> BenchResult<Self> {
        Self::open_path(
            &config.database,
            config.pool_size,
            config.acquire_timeout,
            config.query_timeout,
        )
    }

    pub fn open_path(
        path: &Path,
        pool_size: usize,
        acquire_timeout: Duration,
        query_timeout: Duration,
    ) -> BenchResult<Self> {
        let pool = ConnectionPool::open(
            path,
            pool_size,
            acquire_timeout,
            query_timeout,
            prepare_statements,
        )?;

        tracing::info!(
            "Row store ready: {} connections to {}",
            pool.capacity(),
            path.display()
        );

        Ok(Self {
            pool,
            query_timeout,
            counters: Arc::new(StoreCounters::default()),
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn counters(&self) -> &StoreCounters {
        &self.counters
    }

    /// Point lookup of one `World` row.
    pub async fn fetch_one(&self, id: i32) -> BenchResult<World> {
        let world = self
            .run("fetch_one", move |conn| {
                let mut stmt = conn.prepare_cached(WORLD_SELECT)?;
                stmt.query_row(params![id], |row| {
                    Ok(World {
                        id: row.get(0)?,
                        random_number: row.get(1)?,
                    })
                })
                .optional()?
                .ok_or(BenchError::RowNotFound(id))
            })
            .await?;

        self.counters.rows_read.fetch_add(1, Ordering::Relaxed);
        Ok(world)
    }

    /// Read every row of the `Fortune` table, in table order.
    pub async fn fetch_all_fortunes(&self) -> BenchResult<Vec<Fortune>> {
        let fortunes = self
            .run("fetch_all_fortunes", |conn| {
                let mut stmt = conn.prepare_cached(FORTUNE_SELECT)?;
                let rows = stmt.query_map([], |row| {
                    Ok(Fortune {
                        id: row.get(0)?,
                        message: row.get(1)?,
                    })
                })?;
                let mut fortunes = Vec::with_capacity(16);
                for fortune in rows {
                    fortunes.push(fortune?);
                }
                Ok(fortunes)
            })
            .await?;

        self.counters.fortune_reads.fetch_add(1, Ordering::Relaxed);
        Ok(fortunes)
    }

    /// Overwrite `randomNumber` of one row.
    pub async fn update_one(&self, id: i32, random_number: i32) -> BenchResult<()> {
        self.run("update_one", move |conn| {
            let mut stmt = conn.prepare_cached(WORLD_UPDATE)?;
            match stmt.execute(params![random_number, id])? {
                0 => Err(BenchError::RowNotFound(id)),
                _ => Ok(()),
            }
        })
        .await?;

        self.counters.rows_updated.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stop accepting new store operations.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Check out a connection and run `op` on the blocking pool under the
    /// query deadline. The connection goes back to the pool when `op`
    /// returns, even if the deadline already fired.
    async fn run<F, T>(&self, name: &'static str, op: F) -> BenchResult<T>
    where
        F: FnOnce(&Connection) -> BenchResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.acquire().await?;
        let task = tokio::task::spawn_blocking(move || conn.with_conn(op));

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(BenchError::StoreTimeout(format!(
                "{} exceeded {}ms",
                name,
                self.query_timeout.as_millis()
            ))),
        }
    }
}

fn prepare_statements(conn: &Connection) -> BenchResult<()> {
    for sql in [WORLD_SELECT, WORLD_UPDATE, FORTUNE_SELECT] {
        conn.prepare_cached(sql)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_store(pool_size: usize) -> (RowStore, TempDir) {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let path = tmp.path().join("hello_world.db");
        seed::seed_database(&path, 100).expect("Failed to seed database");
        let store = RowStore::open_path(
            &path,
            pool_size,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .expect("Failed to open store");
        (store, tmp)
    }

    #[test]
    fn test_open_without_tables_fails() {
        let tmp = TempDir::new().unwrap();
        let result = RowStore::open_path(
            &tmp.path().join("empty.db"),
            2,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(BenchError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_one_returns_requested_id() {
        let (store, _tmp) = seeded_store(2);
        for id in 1..=100 {
            let world = store.fetch_one(id).await.unwrap();
            assert_eq!(world.id, id);
            assert!((1..=100).contains(&world.random_number));
        }
        assert_eq!(store.counters().rows_read.load(Ordering::Relaxed), 100);
        assert_eq!(store.pool().stats().in_use, 0);
    }

    #[tokio::test]
    async fn test_fetch_one_missing_row() {
        let (store, _tmp) = seeded_store(1);
        let err = store.fetch_one(101).await.unwrap_err();
        assert!(matches!(err, BenchError::RowNotFound(101)));
        // Connection returned on the error path
        assert_eq!(store.pool().stats().in_use, 0);
        assert!(store.fetch_one(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_then_read() {
        let (store, _tmp) = seeded_store(2);
        store.update_one(7, 9999).await.unwrap();
        let world = store.fetch_one(7).await.unwrap();
        assert_eq!(world.random_number, 9999);
        assert_eq!(store.counters().rows_updated.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let (store, _tmp) = seeded_store(1);
        let err = store.update_one(0, 1).await.unwrap_err();
        assert!(matches!(err, BenchError::RowNotFound(0)));
    }

    #[tokio::test]
    async fn test_fetch_all_fortunes() {
        let (store, _tmp) = seeded_store(1);
        let fortunes = store.fetch_all_fortunes().await.unwrap();
        assert_eq!(fortunes.len(), seed::FORTUNES.len());
        assert_eq!(fortunes[0].id, 1);
        assert_eq!(fortunes[0].message, "fortune: No such file or directory");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_query_deadline_returns_timeout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello_world.db");
        seed::seed_database(&path, 10).unwrap();
        let store = RowStore::open_path(
            &path,
            1,
            Duration::from_secs(5),
            Duration::from_millis(50),
        )
        .unwrap();

        let err = store
            .run("slow_op", |_conn| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::StoreTimeout(_)));
        assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);

        // The connection comes back once the blocking op finishes
        let mut released = false;
        for _ in 0..100 {
            if store.pool().stats().in_use == 0 {
                released = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(released, "connection still checked out");
        assert_eq!(store.fetch_one(1).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_closed_store_fails_requests() {
        let (store, _tmp) = seeded_store(1);
        store.close();
        let err = store.fetch_one(1).await.unwrap_err();
        assert!(matches!(err, BenchError::StoreUnavailable(_)));
    }
}
