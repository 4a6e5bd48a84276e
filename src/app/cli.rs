use super::config::LogLevel;
use crate::delivery::{BacklogReport, redeliver_backlog};
use crate::reliability::{FileSpillStore, SpillStore};
use crate::sender::{BatchTransmitter, ClientConfig, HttpClient};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Operate on a directory of spilled log batches.
#[derive(Debug, Parser)]
#[command(name = "rask-client-logger", version, about)]
pub struct Cli {
    /// Diagnostic log level
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Spilled batch maintenance
    #[command(subcommand)]
    Backlog(BacklogCommand),
}

#[derive(Debug, Subcommand)]
pub enum BacklogCommand {
    /// List spill files and their sizes
    List {
        /// Spill directory
        #[arg(long)]
        dir: PathBuf,
    },
    /// Send every spill file once and remove it
    Replay {
        /// Spill directory
        #[arg(long)]
        dir: PathBuf,
        /// Collector endpoint
        #[arg(long, env = "RASK_LOGGER_SERVER_URL")]
        endpoint: String,
    },
}

impl BacklogCommand {
    pub async fn execute(self) -> Result<()> {
        match self {
            BacklogCommand::List { dir } => {
                let store = FileSpillStore::at(&dir);
                let files = store
                    .list()
                    .await
                    .with_context(|| format!("listing {}", dir.display()))?;

                if files.is_empty() {
                    println!("No spilled batches in {}", dir.display());
                }
                for file in &files {
                    println!("{:>10}  {}", file.size_bytes, file.name);
                }
                Ok(())
            }
            BacklogCommand::Replay { dir, endpoint } => {
                let client = HttpClient::new(ClientConfig {
                    endpoint,
                    ..Default::default()
                })?;
                let report = redeliver_backlog(
                    Arc::new(BatchTransmitter::new(client)),
                    Arc::new(FileSpillStore::at(&dir)),
                )
                .await;
                print_report(&report);
                Ok(())
            }
        }
    }
}

fn print_report(report: &BacklogReport) {
    println!(
        "attempted: {}, delivered: {}, removed: {}",
        report.attempted,
        report.delivered,
        report.deleted.len()
    );
    for name in &report.retained {
        println!("retained: {name}");
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Backlog(cmd) => cmd.execute().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay() {
        let cli = Cli::parse_from([
            "rask-client-logger",
            "backlog",
            "replay",
            "--dir",
            "/tmp/spill",
            "--endpoint",
            "http://localhost:9600/logs",
            "--log-level",
            "debug",
        ]);

        assert_eq!(cli.log_level, LogLevel::Debug);
        match cli.command {
            Commands::Backlog(BacklogCommand::Replay { dir, endpoint }) => {
                assert_eq!(dir, PathBuf::from("/tmp/spill"));
                assert_eq!(endpoint, "http://localhost:9600/logs");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let command = BacklogCommand::List {
            dir: dir.path().to_path_buf(),
        };
        assert!(command.execute().await.is_ok());
    }
}
