use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Filter for the process: the command-line level wins, then `RUST_LOG`,
/// then the configured level.
pub fn env_filter(cli_level: Option<LevelFilter>, configured: &str) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.to_string());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
}

pub fn init_logging(cli_level: Option<LevelFilter>, configured: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli_level, configured))
        .try_init();
}
