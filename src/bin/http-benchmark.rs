//! HTTP Benchmark Suite
//! Measures throughput and latency of every worldbench route
//!
//! Usage:
//!   1. Seed the database: cargo run --release --bin worldbench-seed
//!   2. Start the server: cargo run --release
//!   3. Run this benchmark: cargo run --release --bin http-benchmark

use clap::Parser;
use rayon::prelude::*;
use reqwest::blocking::Client;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "http-benchmark")]
#[command(about = "Load generator for the worldbench routes", long_about = None)]
struct Args {
    /// Base URL of the server under test
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Requests per route and fan-out level
    #[arg(short, long, default_value_t = 2_000)]
    requests: usize,

    /// Worker threads issuing requests
    #[arg(short, long, default_value_t = 8)]
    threads: usize,

    /// Fan-out levels for /queries and /update
    #[arg(long, value_delimiter = ',', default_values_t = vec![1, 5, 10, 15, 20])]
    fanout: Vec<usize>,
}

struct RouteResult {
    name: String,
    requests: usize,
    failures: usize,
    elapsed: Duration,
    latencies: Vec<Duration>,
}

impl RouteResult {
    fn percentile(&self, p: f64) -> Duration {
        if self.latencies.is_empty() {
            return Duration::ZERO;
        }
        let rank = ((self.latencies.len() - 1) as f64 * p).round() as usize;
        self.latencies[rank]
    }
}

fn main() {
    let args = Args::parse();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               worldbench HTTP Benchmark Suite                ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Keep-alive client shared by every worker
    let client = match Client::builder()
        .pool_max_idle_per_host(args.threads)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ Error: failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    // Check server is running
    match client.get(format!("{}/plaintext", args.url)).send() {
        Ok(_) => println!("✅ Server is running at {}\n", args.url),
        Err(_) => {
            eprintln!("❌ Error: Server is not running at {}", args.url);
            eprintln!("   Please start the server with: cargo run --release");
            std::process::exit(1);
        }
    }

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
    {
        eprintln!("❌ Error: failed to configure thread pool: {}", e);
        std::process::exit(1);
    }
    println!(
        "  Using {} threads, {} requests per route\n",
        args.threads, args.requests
    );

    println!("📦 SERIALIZATION");
    print_separator();
    for path in ["/json", "/plaintext", "/json1k", "/json10k"] {
        print_result(&run_route(&client, &args, path.to_string()));
    }
    println!();

    println!("📖 DATABASE READS");
    print_separator();
    print_result(&run_route(&client, &args, "/db".to_string()));
    for n in &args.fanout {
        print_result(&run_route(&client, &args, format!("/queries?queries={}", n)));
    }
    print_result(&run_route(&client, &args, "/fortune".to_string()));
    println!();

    println!("📝 DATABASE UPDATES");
    print_separator();
    for n in &args.fanout {
        print_result(&run_route(&client, &args, format!("/update?queries={}", n)));
    }

    println!("\n✅ All HTTP benchmarks completed!");
}

fn run_route(client: &Client, args: &Args, path: String) -> RouteResult {
    let url = format!("{}{}", args.url, path);
    let start = Instant::now();
    let samples: Vec<Option<Duration>> = (0..args.requests)
        .into_par_iter()
        .map(|_| {
            let sent = Instant::now();
            match client.get(&url).send() {
                Ok(response) if response.status().is_success() => {
                    // Drain the body so the latency covers the full response
                    response.bytes().ok().map(|_| sent.elapsed())
                }
                _ => None,
            }
        })
        .collect();
    let elapsed = start.elapsed();

    let mut latencies: Vec<Duration> = samples.iter().flatten().copied().collect();
    latencies.sort_unstable();

    RouteResult {
        name: format!("GET {}", path),
        requests: args.requests,
        failures: args.requests - latencies.len(),
        elapsed,
        latencies,
    }
}

fn format_duration(d: Duration) -> String {
    if d.as_secs() > 0 {
        format!("{:.2}s", d.as_secs_f64())
    } else if d.as_millis() > 0 {
        format!("{:.2}ms", d.as_secs_f64() * 1000.0)
    } else {
        format!("{:.2}µs", d.as_secs_f64() * 1_000_000.0)
    }
}

fn format_ops_per_sec(count: usize, d: Duration) -> String {
    let ops = count as f64 / d.as_secs_f64();
    if ops >= 1_000_000.0 {
        format!("{:.2}M req/s", ops / 1_000_000.0)
    } else if ops >= 1_000.0 {
        format!("{:.2}K req/s", ops / 1_000.0)
    } else {
        format!("{:.2} req/s", ops)
    }
}

fn print_result(result: &RouteResult) {
    println!(
        "  {:.<32} {:>13} | p50 {:>9} | p99 {:>9} | {} reqs, {} failed",
        result.name,
        format_ops_per_sec(result.requests - result.failures, result.elapsed),
        format_duration(result.percentile(0.50)),
        format_duration(result.percentile(0.99)),
        result.requests,
        result.failures
    );
}

fn print_separator() {
    println!("{}", "-".repeat(95));
}
