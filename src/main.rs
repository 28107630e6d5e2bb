// src/main.rs

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use householdgen::cli::{dispatch, Cli};

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
