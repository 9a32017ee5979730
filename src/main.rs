#![cfg(not(tarpaulin_include))]

use campus_hub::app;
use campus_hub::config::ServerConfig;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    log::info!("Using data directory {}", config.data_dir.display());

    // Start the web application
    app::run(&config).await?;

    Ok(())
}
