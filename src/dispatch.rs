//! Fan-out dispatch for `/db`, `/queries` and `/update`
//!
//! A request's `queries` parameter becomes a clamped count, the count becomes
//! a plan of random row ids (and replacement values for updates), and the
//! plan is executed one row at a time against the [`RowStore`]. Each step
//! holds at most one pooled connection, so a request can never deadlock on
//! the pool by waiting for a connection it already holds.

use rand::Rng;
use serde::Serialize;
use std::num::IntErrorKind;

use crate::config::ServerConfig;
use crate::error::BenchResult;
use crate::store::{RowStore, World};

/// Whether fetched rows are also rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    ReadOnly,
    ReadAndUpdate,
}

/// Parse the raw `queries` value. Absent or malformed input counts as 1;
/// integers outside the `i64` range saturate.
pub fn parse_query_count(raw: Option<&str>) -> i64 {
    let Some(value) = raw else {
        return 1;
    };
    match value.parse::<i64>() {
        Ok(count) => count,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => 1,
        },
    }
}

/// Clamp a requested count into `[1, max_queries]`.
pub fn clamp_query_count(requested: i64, max_queries: usize) -> usize {
    if requested < 1 {
        return 1;
    }
    usize::try_from(requested)
        .unwrap_or(usize::MAX)
        .min(max_queries.max(1))
}

/// Number of rows a request touches.
#[inline]
pub fn effective_count(raw: Option<&str>, max_queries: usize) -> usize {
    clamp_query_count(parse_query_count(raw), max_queries)
}

/// Pull the first `queries` value out of a raw query string.
///
/// A query string that cannot be decoded is treated as if the parameter were
/// absent.
pub fn queries_param(raw_query: Option<&str>) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw_query?).ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == "queries")
        .map(|(_, value)| value)
}

/// One planned row operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub id: i32,
    /// Replacement `randomNumber`, present in update mode
    pub new_random_number: Option<i32>,
}

/// Draw `count` independent row ids from `1..=row_domain_size`, with
/// replacement. In update mode every draw also gets a new value from the same
/// range.
pub fn plan_batch<R: Rng>(
    rng: &mut R,
    count: usize,
    row_domain_size: i32,
    mode: QueryMode,
) -> Vec<Draw> {
    (0..count)
        .map(|_| {
            let id = rng.gen_range(1..=row_domain_size);
            let new_random_number = match mode {
                QueryMode::ReadOnly => None,
                QueryMode::ReadAndUpdate => Some(rng.gen_range(1..=row_domain_size)),
            };
            Draw {
                id,
                new_random_number,
            }
        })
        .collect()
}

/// Response body for the fan-out routes: one object for a single row, an
/// array otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Rows {
    One(World),
    Many(Vec<World>),
}

impl Rows {
    pub fn from_batch(mut worlds: Vec<World>) -> Self {
        if worlds.len() == 1 {
            if let Some(world) = worlds.pop() {
                return Rows::One(world);
            }
        }
        Rows::Many(worlds)
    }

    pub fn len(&self) -> usize {
        match self {
            Rows::One(_) => 1,
            Rows::Many(worlds) => worlds.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executes fan-out plans against the row store.
#[derive(Clone)]
pub struct Dispatcher {
    store: RowStore,
    row_domain_size: i32,
    max_queries: usize,
}

impl Dispatcher {
    pub fn new(store: RowStore, config: &ServerConfig) -> Self {
        Self {
            store,
            row_domain_size: config.row_domain_size,
            max_queries: config.max_queries,
        }
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    /// Fetch one random row.
    pub async fn single(&self) -> BenchResult<World> {
        let id = rand::thread_rng().gen_range(1..=self.row_domain_size);
        self.store.fetch_one(id).await
    }

    /// Resolve the raw `queries` value and run the batch.
    pub async fn dispatch(&self, raw_count: Option<&str>, mode: QueryMode) -> BenchResult<Rows> {
        let count = effective_count(raw_count, self.max_queries);
        let worlds = self.execute(count, mode).await?;
        Ok(Rows::from_batch(worlds))
    }

    /// Run `count` row operations in draw order. The first failure aborts the
    /// batch.
    pub async fn execute(&self, count: usize, mode: QueryMode) -> BenchResult<Vec<World>> {
        let plan = {
            let mut rng = rand::thread_rng();
            plan_batch(&mut rng, count, self.row_domain_size, mode)
        };
        self.execute_plan(&plan).await
    }

    pub async fn execute_plan(&self, plan: &[Draw]) -> BenchResult<Vec<World>> {
        let mut worlds = Vec::with_capacity(plan.len());
        for draw in plan {
            let mut world = self.store.fetch_one(draw.id).await?;
            if let Some(value) = draw.new_random_number {
                self.store.update_one(world.id, value).await?;
                world.random_number = value;
            }
            worlds.push(world);
        }
        Ok(worlds)
    }
}
