//! # Pulse Actions Worker
//!
//! Loads the runtime configuration, resolves the handler for its exchange and
//! topic, and consumes until the first failure. The exit status tells the
//! supervisor what went wrong:
//!
//! | status | cause |
//! |--------|-------|
//! | 1  | no handler registered for the exchange/topic |
//! | 69 | broker unreachable, credentials refused or connection lost |
//! | 70 | a handler failed |
//! | 78 | configuration missing or invalid |

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use pulse_actions::config::{ConfigLoader, RuntimeConfig};
use pulse_actions::constants::exit_codes;
use pulse_actions::handlers::default_registry;
use pulse_actions::logging::init_logging;
use pulse_actions::messaging::service::PulseBroker;
use pulse_actions::{WorkerBootstrap, WorkerResult};

#[derive(Parser, Debug)]
#[command(name = "pulse-actions-worker")]
#[command(about = "Route Pulse messages to the handler registered for their exchange and topic")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Runtime configuration file (default: $PULSE_ACTIONS_CONFIG, then
    /// run_time_config.json next to the executable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter directives; overrides RUST_LOG
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_filter.as_deref()) {
        eprintln!("ERROR:\t{e}");
        process::exit(exit_codes::CONFIGURATION);
    }

    if let Err(e) = run(cli).await {
        let code = e.exit_code();
        if !e.logged_at_source() {
            error!("Worker stopped (exit status {}): {}", code, e);
        }
        process::exit(code);
    }
}

async fn run(cli: Cli) -> WorkerResult<()> {
    let worker_config = ConfigLoader::discover(cli.config)?.load()?;
    let runtime = RuntimeConfig::from(&worker_config);
    let registry = Arc::new(default_registry()?);
    let broker = PulseBroker::new(worker_config.broker.clone());

    info!(
        exchange = %runtime.exchange,
        topic = %runtime.topic,
        dry_run = runtime.dry_run,
        endpoint = %broker.endpoint(),
        "Starting pulse-actions worker"
    );

    WorkerBootstrap::new(registry, Arc::new(broker))
        .run(&runtime)
        .await
}
