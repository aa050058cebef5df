// src/main.rs

mod cli;
mod config;
mod error;
mod llm;
mod persona;
mod session;
mod transcript;
mod ui;

use anyhow::Context;
use clap::Parser;
use reqwest::Client;
use tracing::{error, info};

#[cfg(feature = "logging")]
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Logs go to stderr so they never interleave with chat output on stdout.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> error::Result<()> {
    // Before config, which reads GEMINI_API_KEY from the environment.
    dotenvy::dotenv().ok();

    #[cfg(feature = "logging")]
    init_tracing();

    let args = cli::args::Args::parse();
    info!(?args, "Starting persona chat...");

    let mut config = config::Config::load().context("Failed to load configuration")?;
    args.apply(&mut config)?;

    let client = Client::new();

    if let Err(e) = cli::menu::run(&config, &client, &args).await {
        error!("Application error: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
