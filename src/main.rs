use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worldbench::{config, create_router, payload, RowStore, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "worldbench")]
#[command(about = "worldbench - web framework benchmark server", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "WORLDBENCH_PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "WORLDBENCH_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// SQLite database holding the World and Fortune tables
    #[arg(long, env = "WORLDBENCH_DATABASE", default_value = "./hello_world.db")]
    database: PathBuf,

    /// Number of pooled database connections
    #[arg(long, env = "WORLDBENCH_POOL_SIZE", default_value_t = config::DEFAULT_POOL_SIZE)]
    pool_size: usize,

    /// Size of the World id domain
    #[arg(long, env = "WORLDBENCH_ROW_DOMAIN_SIZE", default_value_t = config::DEFAULT_ROW_DOMAIN_SIZE)]
    row_domain_size: i32,

    /// Upper clamp for the `queries` parameter
    #[arg(long, env = "WORLDBENCH_MAX_QUERIES", default_value_t = config::DEFAULT_MAX_QUERIES)]
    max_queries: usize,

    /// Milliseconds a request may wait for a pooled connection
    #[arg(long, env = "WORLDBENCH_ACQUIRE_TIMEOUT_MS", default_value_t = config::DEFAULT_ACQUIRE_TIMEOUT_MS)]
    acquire_timeout_ms: u64,

    /// Deadline in milliseconds for one database round trip
    #[arg(long, env = "WORLDBENCH_QUERY_TIMEOUT_MS", default_value_t = config::DEFAULT_QUERY_TIMEOUT_MS)]
    query_timeout_ms: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            bind: args.bind,
            port: args.port,
            database: args.database,
            pool_size: args.pool_size,
            row_domain_size: args.row_domain_size,
            max_queries: args.max_queries,
            acquire_timeout: Duration::from_millis(args.acquire_timeout_ms),
            query_timeout: Duration::from_millis(args.query_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let config = ServerConfig::from(Args::parse());

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldbench=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;

    // Broken built-in payloads are a build defect; refuse to start
    payload::verify_all()?;

    let store = RowStore::open(&config)?;
    tracing::info!(
        "Pool capacity {}, row domain 1..={}, max queries {}",
        config.pool_size,
        config.row_domain_size,
        config.max_queries
    );

    let app = create_router(store.clone(), &config);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close();
    let stats = store.pool().stats();
    tracing::info!(
        "Shutdown complete ({} checkouts, peak {} of {} connections in use)",
        stats.total_checkouts,
        stats.peak_in_use,
        stats.capacity
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}
