//! Benchmark fixture data
//!
//! Creates the `World` and `Fortune` tables and fills them with the standard
//! benchmark rows. Used by the `worldbench-seed` tool and by tests; the server
//! itself never writes fixtures.

use rand::Rng;
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::BenchResult;

/// The standard fortune table, in id order starting at 1.
pub const FORTUNES: [&str; 12] = [
    "fortune: No such file or directory",
    "A computer scientist is someone who fixes things that aren't broken.",
    "After enough decimal places, nobody gives a damn.",
    "A bad random number generator: 1, 1, 1, 1, 1, 4.33e+67, 1, 1, 1",
    "A computer program does what you tell it to do, not what you want it to do.",
    "Emacs is a nice operating system, but I prefer UNIX. — Tom Christaensen",
    "Any program that runs right is obsolete.",
    "A list is only as strong as its weakest link. — Donald Knuth",
    "Feature: A bug with seniority.",
    "Computers make very fast, very accurate mistakes.",
    "<script>alert(\"This should not be displayed in a browser alert box.\");</script>",
    "フレームワークのベンチマーク",
];

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS World (
        id INTEGER PRIMARY KEY,
        randomNumber INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS Fortune (
        id INTEGER PRIMARY KEY,
        message TEXT NOT NULL
    );
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub worlds: usize,
    pub fortunes: usize,
}

/// Create (or reset) the benchmark tables in the database at `path`.
pub fn seed_database(path: &Path, row_domain_size: i32) -> BenchResult<SeedReport> {
    let mut conn = Connection::open(path)?;
    seed_connection(&mut conn, row_domain_size, &mut rand::thread_rng())
}

/// Seed through an existing connection with the given random source.
pub fn seed_connection<R: Rng>(
    conn: &mut Connection,
    row_domain_size: i32,
    rng: &mut R,
) -> BenchResult<SeedReport> {
    conn.execute_batch(CREATE_TABLES)?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM World", [])?;
    tx.execute("DELETE FROM Fortune", [])?;
    {
        let mut insert = tx.prepare("INSERT INTO World (id, randomNumber) VALUES (?1, ?2)")?;
        for id in 1..=row_domain_size {
            insert.execute(params![id, rng.gen_range(1..=row_domain_size)])?;
        }

        let mut insert = tx.prepare("INSERT INTO Fortune (id, message) VALUES (?1, ?2)")?;
        for (index, message) in FORTUNES.iter().enumerate() {
            insert.execute(params![index as i64 + 1, *message])?;
        }
    }
    tx.commit()?;

    let report = SeedReport {
        worlds: row_domain_size.max(0) as usize,
        fortunes: FORTUNES.len(),
    };
    tracing::info!(
        "Seeded {} World rows and {} Fortune rows",
        report.worlds,
        report.fortunes
    );
    Ok(report)
}
