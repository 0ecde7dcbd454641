use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "skein")]
#[command(about = "skein - service server with hooks, REST and realtime transports")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace).
    /// Overrides RUST_LOG and the configured level.
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Level requested on the command line, if any.
    pub fn level_override(&self) -> Option<LevelFilter> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level.into()),
            (None, true) => Some(LevelFilter::DEBUG),
            (None, false) => None,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the service server
    Serve {
        /// Directory holding default.toml and profile overlays
        #[arg(short = 'c', long, default_value = "config")]
        config_dir: PathBuf,

        /// Profile overlay to apply (defaults to $SKEIN_ENV)
        #[arg(short, long)]
        profile: Option<String>,

        /// Listen port (overrides [server] port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the WebSocket pub/sub hub used by relays
    Hub {
        #[arg(long, default_value = "127.0.0.1:4040")]
        addr: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["skein", "serve"]).unwrap();
        match cli.command.clone() {
            Commands::Serve {
                config_dir,
                profile,
                port,
            } => {
                assert_eq!(config_dir, PathBuf::from("config"));
                assert_eq!(profile, None);
                assert_eq!(port, None);
            }
            other => panic!("expected serve, got {:?}", other),
        }
        assert_eq!(cli.level_override(), None);
    }

    #[test]
    fn test_global_log_flags() {
        let cli = Cli::try_parse_from(["skein", "hub", "--verbose"]).unwrap();
        assert_eq!(cli.level_override(), Some(LevelFilter::DEBUG));

        let cli = Cli::try_parse_from(["skein", "-l", "warn", "-v", "serve", "--port", "8080"]).unwrap();
        assert_eq!(cli.level_override(), Some(LevelFilter::WARN));
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080), .. }));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["skein"]).is_err());
    }
}
