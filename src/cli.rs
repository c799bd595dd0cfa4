//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bearer-token gateway: credential login, trusted-origin login and allowlisted forwarding
#[derive(Parser, Debug)]
#[command(name = "tokengate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "TOKENGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port of the public listener
    #[arg(short, long, env = "TOKENGATE_PORT")]
    pub port: Option<u16>,

    /// Host to bind the public listener to
    #[arg(long, env = "TOKENGATE_HOST")]
    pub host: Option<String>,

    /// Port of the internal (trusted-origin) listener
    #[arg(long, env = "TOKENGATE_INTERNAL_PORT")]
    pub internal_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "TOKENGATE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "TOKENGATE_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Load and validate configuration, then print a redacted summary
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["tokengate"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn parses_overrides_and_subcommand() {
        let cli = Cli::try_parse_from([
            "tokengate",
            "--port",
            "8080",
            "--internal-port",
            "8081",
            "check-config",
            "--config",
            "gate.yaml",
        ])
        .unwrap();

        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.internal_port, Some(8081));
        assert!(matches!(cli.command, Some(Command::CheckConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("gate.yaml")));
    }
}
