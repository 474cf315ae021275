//! Selector driver.
//!
//! Loads a selector configuration, builds the configured strategy and drives
//! it: simulated traffic, table inspection, or a hot-reload loop that feeds
//! config file changes into `update_server` the way a discovery watcher would.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use rpc_selector::config::watcher::ConfigWatcher;
use rpc_selector::config::{load_config, SelectorConfig};
use rpc_selector::observability::{logging, metrics};
use rpc_selector::selector::metadata::filter_servers;
use rpc_selector::selector::{
    HashRing, SelectMode, Selector, WeightedLatencySelector, WeightedRoundRobinSelector,
};
use rpc_selector::{new_selector, CallContext};

#[derive(Parser)]
#[command(name = "rpc-selector")]
#[command(about = "Drive an RPC server selector from a config file", long_about = None)]
struct Cli {
    /// Path to the selector configuration (TOML).
    #[arg(short, long, default_value = "selector.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a number of selections and print the distribution
    Simulate {
        #[arg(short = 'n', long, default_value_t = 1000)]
        calls: usize,
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long, default_value = "")]
        method: String,
        /// Request payload, used by the path_method_args hash key
        #[arg(long)]
        args: Option<String>,
    },
    /// Print the strategy, members and computed weights
    Inspect,
    /// Reload on config changes and print a distribution every interval
    Watch {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        #[arg(short = 'n', long, default_value_t = 100)]
        calls: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    tracing::info!(
        config = %cli.config.display(),
        strategy = %config.strategy,
        servers = config.servers.len(),
        "Configuration loaded"
    );

    let servers = filter_servers(&config.servers, config.group_filter());
    let selector = new_selector(config.strategy, &servers, &config.selector_options());

    match cli.command {
        Commands::Simulate {
            calls,
            path,
            method,
            args,
        } => {
            let report = distribution(
                selector.as_ref(),
                calls,
                &path,
                &method,
                args.as_deref().map(str::as_bytes),
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Inspect => {
            println!("{}", serde_json::to_string_pretty(&inspect(&config, &servers))?);
        }
        Commands::Watch { interval_ms, calls } => {
            watch(&cli.config, config, selector, interval_ms, calls).await?;
        }
    }

    Ok(())
}

fn distribution(
    selector: &dyn Selector,
    calls: usize,
    path: &str,
    method: &str,
    args: Option<&[u8]>,
) -> serde_json::Value {
    let ctx = CallContext::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut unselected = 0usize;
    for _ in 0..calls {
        match selector.select(&ctx, path, method, args) {
            Some(server) => *counts.entry(server).or_default() += 1,
            None => unselected += 1,
        }
    }
    json!({
        "strategy": selector.name(),
        "calls": calls,
        "unselected": unselected,
        "distribution": counts,
    })
}

fn inspect(config: &SelectorConfig, servers: &HashMap<String, String>) -> serde_json::Value {
    let mut members: Vec<&String> = servers.keys().collect();
    members.sort();

    let table = match config.strategy {
        SelectMode::WeightedRoundRobin => Some(WeightedRoundRobinSelector::new(servers).entries()),
        SelectMode::WeightedLatency => Some(WeightedLatencySelector::new(servers).entries()),
        _ => None,
    };
    let weights = table.map(|entries| {
        entries
            .into_iter()
            .map(|w| json!({ "server": w.server, "weight": w.weight }))
            .collect::<Vec<_>>()
    });

    let ring_points = (config.strategy == SelectMode::ConsistentHash).then(|| {
        HashRing::new(servers.keys().cloned(), config.hash.virtual_nodes).point_count()
    });

    json!({
        "strategy": config.strategy,
        "group": config.group_filter(),
        "members": members,
        "weights": weights,
        "ring_points": ring_points,
    })
}

async fn watch(
    path: &std::path::Path,
    mut config: SelectorConfig,
    selector: Box<dyn Selector>,
    interval_ms: u64,
    calls: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let _watcher = watcher.run()?;
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = distribution(selector.as_ref(), calls, "", "", None);
                println!("{}", serde_json::to_string(&report)?);
            }
            Some(new_config) = updates.recv() => {
                if new_config.strategy != config.strategy {
                    tracing::warn!(
                        current = %config.strategy,
                        requested = %new_config.strategy,
                        "Strategy changes need a restart; applying servers only"
                    );
                }
                let servers = filter_servers(&new_config.servers, new_config.group_filter());
                selector.update_server(&servers);
                config = SelectorConfig {
                    strategy: config.strategy,
                    ..new_config
                };
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping watch loop");
                break;
            }
        }
    }

    Ok(())
}
