//! plc-link - poll and write CODESYS variables over OPC UA
//!
//! ```bash
//! # Poll the default warehouse counters once per second until Ctrl-C
//! plc-link
//!
//! # Same, with a config file and a bounded number of cycles
//! plc-link --config plc-link.toml poll --cycles 10
//!
//! # Read the variables once without writing
//! plc-link read
//!
//! # Send recipes for the ERP orders in ./Orders to cell C1
//! plc-link dispatch --orders Orders
//! ```

use clap::{Parser, Subcommand};
use plc_link::app;
use plc_link::config::Config;
use plc_link::dispatch::orders::load_orders;
use plc_link::error::Result;
use plc_link::transport::OpcUaConnector;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Parser)]
#[command(name = "plc-link")]
#[command(about = "OPC UA link to a CODESYS controller")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file (built-in defaults if omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Override the server endpoint, e.g. opc.tcp://127.0.0.1:4840
    #[arg(long, global = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, log, wait and write back in a loop (default)
    Poll {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Read every variable once, without writing
    Read,
    /// Send recipes for queued ERP orders to the work cell
    Dispatch {
        /// Directory with *.json order files (overrides dispatch.orders_dir)
        #[arg(short, long)]
        orders: Option<String>,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.server.endpoint = endpoint.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args, config: Config) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::Relaxed))
        .map_err(|e| plc_link::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let connector = OpcUaConnector;
    match args.command.unwrap_or(Commands::Poll { cycles: None }) {
        Commands::Poll { cycles } => {
            log::info!("Press Ctrl-C to stop");
            app::run_poll(&connector, &config, &running, cycles)?;
        }
        Commands::Read => {
            let outcomes = app::run_read(&connector, &config)?;
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            if failed > 0 {
                log::warn!("{} of {} reads failed", failed, outcomes.len());
            }
        }
        Commands::Dispatch { orders } => {
            let dir = orders.unwrap_or_else(|| config.dispatch.orders_dir.clone());
            log::info!("Loading orders from {}", dir);
            let queue = load_orders(&dir)?;
            app::run_dispatch(&connector, &config, queue, &running)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = load_config(&args);

    // Initialize logger
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("plc-link v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config.and_then(|config| {
        log::info!("Endpoint: {}", config.server.endpoint);
        run(args, config)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
