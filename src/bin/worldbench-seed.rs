use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worldbench::config;
use worldbench::store::seed;

#[derive(Parser, Debug)]
#[command(name = "worldbench-seed")]
#[command(about = "Create and fill the World and Fortune tables", long_about = None)]
struct Args {
    /// SQLite database to (re)create
    #[arg(long, env = "WORLDBENCH_DATABASE", default_value = "./hello_world.db")]
    database: PathBuf,

    /// Number of World rows
    #[arg(long, env = "WORLDBENCH_ROW_DOMAIN_SIZE", default_value_t = config::DEFAULT_ROW_DOMAIN_SIZE)]
    row_domain_size: i32,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldbench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.row_domain_size < 1 {
        anyhow::bail!("row domain size must be at least 1");
    }

    let report = seed::seed_database(&args.database, args.row_domain_size)?;
    println!(
        "Seeded {}: {} World rows, {} Fortune rows",
        args.database.display(),
        report.worlds,
        report.fortunes
    );

    Ok(())
}
