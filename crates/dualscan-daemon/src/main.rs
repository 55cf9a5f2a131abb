//! Dualscan daemon - pairs the reports of two scanning stations and stores accepted items.

mod app;
mod ipc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dualscan_config_and_utils::{init_logging, Config, Paths};

/// Dualscan command-line interface.
#[derive(Parser, Debug)]
#[command(name = "dualscan")]
#[command(about = "Two-station scan reconciliation daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (socket, logs, config, records). Defaults to ~/.dualscan
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the daemon in the foreground
    Start {
        /// TCP port for station 1
        #[arg(long)]
        port1: Option<u16>,
        /// TCP port for station 2
        #[arg(long)]
        port2: Option<u16>,
        /// Required distinct auxiliary codes per item (non-positive uses the default)
        #[arg(long, allow_negative_numbers = true)]
        expected_aux_count: Option<i64>,
    },
    /// Stop the daemon, saving accepted records
    Stop,
    /// Show daemon and engine status
    Status,
    /// Save accepted records now and clear the log
    Flush,
    /// Discard accepted records without saving
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, &paths);

    match cli.command.unwrap_or(Commands::Start {
        port1: None,
        port2: None,
        expected_aux_count: None,
    }) {
        Commands::Start {
            port1,
            port2,
            expected_aux_count,
        } => {
            if let Some(port) = port1 {
                config.port1 = port;
            }
            if let Some(port) = port2 {
                config.port2 = port;
            }
            if expected_aux_count.is_some() {
                config.expected_aux_count = expected_aux_count;
            }
            config.validate()?;
            app::run_daemon(config, paths).await?;
        }
        Commands::Stop => app::stop_daemon(&paths).await?,
        Commands::Status => app::check_status(&paths).await?,
        Commands::Flush => app::flush_records(&paths).await?,
        Commands::Reset => app::reset_records(&paths).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_overrides() {
        let cli = Cli::try_parse_from([
            "dualscan",
            "start",
            "--port1",
            "7001",
            "--expected-aux-count",
            "-1",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Start {
                port1: Some(7001),
                port2: None,
                expected_aux_count: Some(-1),
            })
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli =
            Cli::try_parse_from(["dualscan", "status", "--base-dir", "/tmp/ds", "-l", "debug"])
                .unwrap();
        assert_eq!(cli.command, Some(Commands::Status));
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/ds")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["dualscan"]).unwrap();
        assert!(cli.command.is_none());
    }
}
