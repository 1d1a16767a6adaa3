pub mod config;
pub mod dispatch;
pub mod error;
pub mod fortune;
pub mod payload;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use dispatch::{Dispatcher, QueryMode, Rows};
pub use error::{BenchError, BenchResult};
pub use server::create_router;
pub use store::{ConnectionPool, Fortune, PoolStats, RowStore, World};
