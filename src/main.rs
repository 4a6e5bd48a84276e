use anyhow::Result;
use clap::Parser;
use rask_client_logger::app::{self, cli::Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    app::setup_logging(cli.log_level)?;
    tracing::debug!("rask-client-logger v{}", app::get_version());

    app::cli::run(cli).await
}
