//! proxy-pool command line.
//!
//! ```text
//!   proxy-pool.toml ──▶ loader ──▶ ProxyPool ──select──▶ RespClient ──▶ proxy A
//!         │                           ▲                               ──▶ proxy B
//!         └──── watcher ──▶ reload ───┘ reconcile                     ──▶ proxy C
//! ```
//!
//! - `check`: validate the config and list the endpoints
//! - `exec`: send a command through the pool
//! - `watch`: keep a pool alive and follow config changes until Ctrl-C

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use proxy_pool::client::{Command, EndpointClient, RespClientFactory};
use proxy_pool::config::{load_config, watcher::ConfigWatcher, PoolConfig};
use proxy_pool::lifecycle::{run_reload_loop, Shutdown};
use proxy_pool::observability::{logging, metrics};
use proxy_pool::ProxyPool;

#[derive(Parser)]
#[command(name = "proxy-pool")]
#[command(about = "Round-robin client pool for Redis-protocol proxies", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "proxy-pool.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and list endpoints
    Check {
        /// Print the parsed configuration as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a command through the pool, e.g. `exec -- SET k v`
    Exec {
        /// Number of times to send the command
        #[arg(short, long, default_value_t = 1)]
        repeat: usize,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Keep the pool running and reconcile on config changes
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        path = %cli.config.display(),
        endpoints = config.pool.endpoints.len(),
        pool_size = config.client.pool_size,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Check { json } => check(&config, json)?,
        Commands::Exec { repeat, args } => exec(config, repeat, args).await?,
        Commands::Watch => watch(cli.config, config).await?,
    }

    Ok(())
}

fn check(config: &PoolConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let mut endpoints = config.endpoint_addrs()?;
    endpoints.sort();
    println!("configuration OK, {} endpoint(s) in rotation order:", endpoints.len());
    for endpoint in endpoints {
        println!("  {endpoint}");
    }
    Ok(())
}

async fn exec(config: PoolConfig, repeat: usize, args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let command = Command::from_args(&args).ok_or("no command given")?;
    let pool = ProxyPool::new(config.endpoint_addrs()?, config.client, RespClientFactory)?;

    let mut failures = 0;
    for _ in 0..repeat {
        let member = pool.select()?;
        match member.issue(command.clone()).await {
            Ok(reply) => println!("[{}] {}", member.addr(), reply),
            Err(e) => {
                failures += 1;
                eprintln!("[{}] error: {}", member.addr(), e);
            }
        }
    }

    pool.shutdown();
    if failures > 0 {
        return Err(format!("{failures} of {repeat} command(s) failed").into());
    }
    Ok(())
}

async fn watch(path: PathBuf, config: PoolConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pool = Arc::new(ProxyPool::new(config.endpoint_addrs()?, config.client, RespClientFactory)?);
    tracing::info!(members = ?pool.addresses(), "Proxy pool ready");

    let shutdown = Shutdown::new();
    let (watcher, updates) = ConfigWatcher::new(&path);
    let _watcher = watcher.run()?;

    let reload = tokio::spawn(run_reload_loop(pool.clone(), updates, shutdown.subscribe()));

    shutdown.trigger_on_ctrl_c().await?;
    reload.await?;
    pool.shutdown();

    tracing::info!("Shutdown complete");
    Ok(())
}
