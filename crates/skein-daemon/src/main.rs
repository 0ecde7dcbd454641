use anyhow::{Context, Result};
use clap::Parser;
use skein_config::ConfigLoader;
use skein_daemon::{init_logging, server, Cli, Commands};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            ref config_dir,
            ref profile,
            port,
        } => {
            let mut loader = ConfigLoader::from_env(config_dir);
            if let Some(profile) = profile {
                loader = loader.with_profile(profile.as_str());
            }
            let mut config = loader
                .load()
                .with_context(|| format!("Failed to load config from {}", config_dir.display()))?;
            if let Some(port) = port {
                config.server.port = port;
            }

            init_logging(cli.level_override(), &config.logging.level);
            info!(
                "Starting skein v{} (profile: {})",
                env!("CARGO_PKG_VERSION"),
                loader.profile().unwrap_or("default")
            );
            server::serve(&config).await
        }
        Commands::Hub { ref addr } => {
            init_logging(cli.level_override(), "info");
            server::hub(addr).await
        }
    }
}
