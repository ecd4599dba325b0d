// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waitline - waitlist matching & claim-offer service.
//!
//! This is the binary entry point for the Waitline service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use waitline::{serve, sweeper};
use waitline_config::WaitlineConfig;
use waitline_engine::ExpirySweep;
use waitline_storage::SqliteStore;

/// Waitline - waitlist matching & claim-offer service.
#[derive(Parser, Debug)]
#[command(name = "waitline", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP surface and background sweep.
    Serve,
    /// Run the expiry sweep without the HTTP surface.
    Sweep {
        /// Run a single pass and exit.
        #[arg(long)]
        once: bool,
    },
    /// Validate configuration and print a summary.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            waitline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    let result = match cli.command {
        Some(Commands::Serve) | None => serve::run(config).await,
        Some(Commands::Sweep { once }) => run_sweep(config, once).await,
        Some(Commands::Config) => {
            println!(
                "config ok: service.name={} storage.database_path={} claim window={}min",
                config.service.name,
                config.storage.database_path,
                config.waitlist.default_claim_expiry_minutes,
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("waitline: {e}");
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<WaitlineConfig, Vec<waitline_config::ConfigError>> {
    match path {
        Some(path) => match waitline_config::load_config_from_path(path) {
            Ok(config) => {
                waitline_config::validation::validate_config(&config)?;
                Ok(config)
            }
            Err(e) => Err(waitline_config::diagnostic::figment_to_config_errors(e)),
        },
        None => waitline_config::load_and_validate(),
    }
}

fn init_tracing(config: &WaitlineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_sweep(
    config: WaitlineConfig,
    once: bool,
) -> Result<(), waitline_core::WaitlineError> {
    let store = SqliteStore::open(&config.storage.database_path).await?;
    let sweep = Arc::new(ExpirySweep::new(
        store.clone(),
        store.clone(),
        store,
        serve::sweep_config(&config),
    ));

    if once {
        let report = sweep.run_once(Utc::now()).await?;
        println!(
            "sweep: {} lapsed seen, {} expired, {} requeued, {} orphans reverted, {} lost races",
            report.lapsed_seen,
            report.expired,
            report.requeued,
            report.orphans_reverted,
            report.lost_races,
        );
        return Ok(());
    }

    let cancel = tokio_util::sync::CancellationToken::new();
    let loop_cancel = cancel.clone();
    let handle = tokio::spawn(sweeper::run_loop(
        sweep,
        std::time::Duration::from_secs(config.waitlist.sweep_interval_secs),
        loop_cancel,
    ));
    let _ = tokio::signal::ctrl_c().await;
    cancel.cancel();
    let _ = handle.await;
    Ok(())
}
