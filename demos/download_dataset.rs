use anyhow::{Context, Result};
use arlula::Client;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure credentials via env vars or a `.arlularc` file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arlula=info")),
        )
        .init();

    let dataset = std::env::args()
        .nth(1)
        .context("usage: download_dataset <dataset-id> [directory]")?;
    let directory = std::env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let client = Client::from_env()?;
    client.validate_credentials()?;

    for path in client.download_dataset(&dataset, Some(directory.as_path()))? {
        println!("{}", path.display());
    }
    Ok(())
}
