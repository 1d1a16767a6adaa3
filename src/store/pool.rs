//! Bounded SQLite connection pool
//!
//! The pool owns a fixed number of connections opened at startup. A caller
//! first obtains a semaphore permit (this is where requests wait when every
//! connection is busy) and then claims one free slot with an atomic
//! compare-and-swap. The returned [`PooledConnection`] gives the slot back when
//! dropped, on success and error paths alike.
//!
//! A slot is only ever claimed by one permit holder at a time, so a connection
//! is never shared by two concurrent operations.

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{BenchError, BenchResult};

/// A fixed-capacity pool of SQLite connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    slots: Vec<Slot>,
    permits: Arc<Semaphore>,
    /// Round-robin start index for slot selection
    next_index: AtomicUsize,
    in_use: AtomicUsize,
    peak_in_use: AtomicUsize,
    total_checkouts: AtomicUsize,
    acquire_timeout: Duration,
}

/// One pooled connection with usage tracking
struct Slot {
    conn: Mutex<Connection>,
    /// Claimed by a checkout (lock-free acquisition)
    in_use: AtomicBool,
    use_count: AtomicUsize,
}

impl ConnectionPool {
    /// Open `size` connections to the database at `path`.
    ///
    /// `init` runs once on every connection after it is opened; the row store
    /// uses it to prepare its statements. Any failure aborts pool creation.
    pub fn open<F>(
        path: &Path,
        size: usize,
        acquire_timeout: Duration,
        busy_timeout: Duration,
        init: F,
    ) -> BenchResult<Self>
    where
        F: Fn(&Connection) -> BenchResult<()>,
    {
        if size == 0 {
            return Err(BenchError::Config("pool size must be at least 1".into()));
        }

        let mut slots = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open(path)?;
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            init(&conn)?;
            slots.push(Slot {
                conn: Mutex::new(conn),
                in_use: AtomicBool::new(false),
                use_count: AtomicUsize::new(0),
            });
        }

        tracing::debug!("Opened {} connections to {}", size, path.display());

        Ok(Self {
            inner: Arc::new(PoolInner {
                slots,
                permits: Arc::new(Semaphore::new(size)),
                next_index: AtomicUsize::new(0),
                in_use: AtomicUsize::new(0),
                peak_in_use: AtomicUsize::new(0),
                total_checkouts: AtomicUsize::new(0),
                acquire_timeout,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }

    /// Check out a connection, waiting up to the acquire timeout when the
    /// pool is exhausted.
    pub async fn acquire(&self) -> BenchResult<PooledConnection> {
        let waiting = self.inner.permits.clone().acquire_owned();
        let permit = match tokio::time::timeout(self.inner.acquire_timeout, waiting).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(BenchError::StoreUnavailable(
                    "connection pool is closed".into(),
                ))
            }
            Err(_) => {
                return Err(BenchError::StoreTimeout(format!(
                    "no connection available within {}ms",
                    self.inner.acquire_timeout.as_millis()
                )))
            }
        };

        let index = self.inner.claim_slot();
        Ok(PooledConnection {
            pool: self.inner.clone(),
            index,
            _permit: permit,
        })
    }

    /// Stop handing out connections. Pending and future checkouts fail with
    /// `StoreUnavailable`; connections already checked out finish normally.
    pub fn close(&self) {
        self.inner.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// Get pool statistics (lock-free)
    pub fn stats(&self) -> PoolStats {
        let total_uses = self
            .inner
            .slots
            .iter()
            .map(|slot| slot.use_count.load(Ordering::Relaxed))
            .sum();

        PoolStats {
            capacity: self.capacity(),
            in_use: self.inner.in_use.load(Ordering::Acquire),
            peak_in_use: self.inner.peak_in_use.load(Ordering::Relaxed),
            total_checkouts: self.inner.total_checkouts.load(Ordering::Relaxed),
            total_uses,
        }
    }
}

impl PoolInner {
    /// Claim a free slot. Only called while holding a permit, so at most
    /// `capacity - 1` other slots can be claimed and the scan terminates.
    fn claim_slot(&self) -> usize {
        let size = self.slots.len();
        let start = self.next_index.fetch_add(1, Ordering::Relaxed) % size;
        loop {
            for i in 0..size {
                let idx = (start + i) % size;
                let slot = &self.slots[idx];
                if slot
                    .in_use
                    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    slot.use_count.fetch_add(1, Ordering::Relaxed);
                    self.total_checkouts.fetch_add(1, Ordering::Relaxed);
                    let now = self.in_use.fetch_add(1, Ordering::AcqRel) + 1;
                    self.peak_in_use.fetch_max(now, Ordering::Relaxed);
                    return idx;
                }
            }
            // A slot is being released by another permit holder
            std::hint::spin_loop();
        }
    }

    fn release_slot(&self, index: usize) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
        self.slots[index].in_use.store(false, Ordering::Release);
    }
}

/// RAII guard for a checked-out connection.
///
/// The slot is released before the semaphore permit, so the next permit
/// holder always finds a free slot.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    index: usize,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Run `f` against the underlying connection.
    ///
    /// This blocks on SQLite I/O; async callers run it on the blocking pool.
    pub fn with_conn<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Connection) -> R,
    {
        let guard = self.pool.slots[self.index].conn.lock();
        f(&guard)
    }

    /// Index of the slot this guard holds
    #[cfg(test)]
    fn slot(&self) -> usize {
        self.index
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.release_slot(self.index);
    }
}

/// Statistics about the connection pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of connections in the pool
    pub capacity: usize,
    /// Connections currently checked out
    pub in_use: usize,
    /// Highest number of simultaneous checkouts observed
    pub peak_in_use: usize,
    /// Total number of successful checkouts
    pub total_checkouts: usize,
    /// Sum of per-connection use counters
    pub total_uses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn test_pool(size: usize, acquire_timeout: Duration) -> (ConnectionPool, TempDir) {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let pool = ConnectionPool::open(
            &tmp.path().join("pool.db"),
            size,
            acquire_timeout,
            Duration::from_secs(1),
            |_| Ok(()),
        )
        .expect("Failed to open pool");
        (pool, tmp)
    }

    #[test]
    fn test_pool_creation() {
        let (pool, _tmp) = test_pool(4, Duration::from_secs(1));
        assert_eq!(pool.capacity(), 4);

        let stats = pool.stats();
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.total_checkouts, 0);
    }

    #[test]
    fn test_zero_size_rejected() {
        let tmp = TempDir::new().unwrap();
        let result = ConnectionPool::open(
            &tmp.path().join("pool.db"),
            0,
            Duration::from_secs(1),
            Duration::from_secs(1),
            |_| Ok(()),
        );
        assert!(matches!(result, Err(BenchError::Config(_))));
    }

    #[test]
    fn test_init_failure_aborts_open() {
        let tmp = TempDir::new().unwrap();
        let result = ConnectionPool::open(
            &tmp.path().join("pool.db"),
            2,
            Duration::from_secs(1),
            Duration::from_secs(1),
            |conn| {
                conn.prepare("SELECT id FROM missing_table")?;
                Ok(())
            },
        );
        assert!(matches!(result, Err(BenchError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_acquire_release() {
        let (pool, _tmp) = test_pool(2, Duration::from_secs(1));

        {
            let guard = pool.acquire().await.unwrap();
            assert_eq!(pool.stats().in_use, 1);

            let value: i64 = guard.with_conn(|conn| conn.query_row("SELECT 1 + 1", [], |row| row.get(0)).unwrap());
            assert_eq!(value, 2);
        }

        let stats = pool.stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.total_checkouts, 1);
        assert_eq!(stats.total_uses, 1);
    }

    #[tokio::test]
    async fn test_checkouts_use_distinct_slots() {
        let (pool, _tmp) = test_pool(3, Duration::from_secs(1));

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        let c = pool.acquire().await.unwrap();

        let slots: HashSet<usize> = [a.slot(), b.slot(), c.slot()].into_iter().collect();
        assert_eq!(slots.len(), 3);
        assert_eq!(pool.stats().peak_in_use, 3);
    }

    #[tokio::test]
    async fn test_exhausted_pool_times_out() {
        let (pool, _tmp) = test_pool(1, Duration::from_millis(20));

        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire().await;
        assert!(matches!(result, Err(BenchError::StoreTimeout(_))));
    }

    #[tokio::test]
    async fn test_waiter_resumes_after_release() {
        let (pool, _tmp) = test_pool(1, Duration::from_secs(5));

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|guard| guard.slot()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let slot = waiter.await.unwrap().unwrap();
        assert_eq!(slot, 0);
        assert_eq!(pool.stats().total_checkouts, 2);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_checkout() {
        let (pool, _tmp) = test_pool(2, Duration::from_secs(1));
        pool.close();
        assert!(pool.is_closed());

        let result = pool.acquire().await;
        assert!(matches!(result, Err(BenchError::StoreUnavailable(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_never_exceeds_capacity() {
        let (pool, _tmp) = test_pool(4, Duration::from_secs(10));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let guard = pool.acquire().await.unwrap();
                    tokio::task::spawn_blocking(move || {
                        guard.with_conn(|conn| {
                            let value: i64 = conn
                                .query_row("SELECT ?1 + 1", [i], |row| row.get(0))
                                .unwrap();
                            assert_eq!(value, i + 1);
                        });
                        std::thread::sleep(Duration::from_millis(2));
                    })
                    .await
                    .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("Task panicked");
        }

        let stats = pool.stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.total_checkouts, 32);
        assert!(stats.peak_in_use <= 4);
    }
}
