// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the thermostat controller
use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use rust_thermostat::config::{self, Config, DriverType};
use rust_thermostat::daemon::{wait_for_shutdown_signal, Supervisor};

/// Closed-loop temperature indicator controller
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long, default_value = "thermostat.yaml")]
    config: PathBuf,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Initial setpoint in degrees Fahrenheit
    #[arg(long, allow_negative_numbers = true)]
    setpoint: Option<i64>,

    /// Hardware driver family
    #[arg(long, value_enum)]
    driver: Option<DriverType>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn log_level(args: &Args, config_debug: bool) -> log::LevelFilter {
    if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose || config_debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        init_logging(log_level(&args, false));
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = &args.validate_config {
        init_logging(log_level(&args, false));
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // The configuration may raise the log level, so load it first
    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.setpoint, args.driver, args.verbose);
    init_logging(log_level(&args, config.debug));
    info!("Configuration loaded from {}", args.config.display());

    let mut supervisor = Supervisor::new();
    supervisor.launch(&config).await?;

    // Wait for termination signal
    match wait_for_shutdown_signal().await {
        Ok(signal) => info!("Received {}, terminating", signal),
        Err(err) => error!("Error waiting for shutdown signal: {}", err),
    }

    supervisor.shutdown().await;
    supervisor.join().await?;
    Ok(())
}
