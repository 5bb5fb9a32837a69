use std::process::ExitCode;

use clap::Parser;
use trellis_cli::cli::Cli;
use trellis_cli::commands;
use trellis_cli::config::{AppConfig, LogFormat};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    // Logs go to stderr; stdout carries command output.
    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr);
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr);
            registry.with(fmt_layer).init();
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    let output = commands::run(cli.command, &config)?;
    if !output.text.is_empty() {
        println!("{}", output.text);
    }

    Ok(if output.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
