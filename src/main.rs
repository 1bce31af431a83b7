//! Shoe customizer - headless customizer view
//!
//! Loads the shoe model, listens for host messages on stdin or a local
//! WebSocket and keeps the model in sync with the requested customization.
//! Press Ctrl+C to exit.

use clap::Parser;
use shoe_customizer::app;
use shoe_customizer::config::Cli;
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    let mut logger = env_logger::Builder::from_env(env);
    if let Some(filter) = &cli.log {
        logger.parse_filters(filter);
    }
    logger.format_timestamp_millis().init();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::from(2);
        }
    };

    log::info!("Shoe customizer {}", env!("CARGO_PKG_VERSION"));
    log::info!("   Press Ctrl+C to exit");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to create tokio runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(app::run(config));
    // a blocking stdin read may still be parked on the blocking pool
    runtime.shutdown_timeout(Duration::from_millis(250));

    match result {
        Ok(()) => {
            log::info!("Goodbye!");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
