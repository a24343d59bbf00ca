//! WRM CLI - Command line tool for composing river monitoring map data.

use clap::Parser;
use log::debug;

#[derive(Parser)]
#[command(
    name = "wrm-cli",
    version,
    about = "Wimmera river monitoring map toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: wrm_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // WRM_API_BASE may come from a local .env file.
    let env_file = dotenv::dotenv().ok();
    env_logger::init();
    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }
    let cli = Cli::parse();
    wrm_cmd::run(cli.command).await
}
