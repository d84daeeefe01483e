//! # Neun CLI
//!
//! Runs coupled neuron simulations described in TOML files and prints the
//! recorded traces as whitespace-separated columns.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use neun_cli::NeunCli;

fn main() {
    let cli = NeunCli::parse();

    // RUST_LOG wins; otherwise -v raises the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = cli.execute() {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }
}
