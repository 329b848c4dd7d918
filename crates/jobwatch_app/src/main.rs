mod app;
mod commands;
mod config;
mod effects;
mod persistence;
mod render;

use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "jobwatch.ron";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = config::AppConfig::load(&config_path)?;
    app::run(config).await
}
