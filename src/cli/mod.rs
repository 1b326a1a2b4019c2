//! CLI module for the care-request shim
//!
//! # Commands
//!
//! - `serve` - Start the HTTP API
//! - `sync` - Poll the care-provider feed once and reconcile it
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! care-shim serve
//!
//! # One feed sync (run from cron)
//! CARE_SHIM_FEED_TOKEN=... care-shim sync -c /etc/care-shim.toml
//!
//! # Generate shell completions
//! care-shim completions bash > ~/.bash_completion.d/care-shim
//! ```

pub mod completions;
pub mod config;
pub mod serve;
pub mod sync;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::ShimConfig;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "care-shim.toml";

/// care-shim - COVID-19 care-request API over a hosted record store
#[derive(Parser, Debug)]
#[command(
    name = "care-shim",
    version,
    about = "COVID-19 care-request API over a hosted record store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),
    /// Poll the care-provider feed and mark reported requests as PROVIDED
    Sync(SyncArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "CARE_SHIM_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "CARE_SHIM_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CARE_SHIM_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override the provider feed URL
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CARE_SHIM_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load `path` if it exists (defaults otherwise), then apply `CARE_SHIM_*` overrides.
pub fn load_config(path: &Path) -> Result<ShimConfig, crate::config::ConfigError> {
    let config = if path.exists() {
        ShimConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        ShimConfig::default()
    };
    Ok(config.with_env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["care-shim", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("care-shim.toml"));
                assert!(args.host.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_config() {
        let cli = Cli::try_parse_from(["care-shim", "serve", "-c", "custom.toml"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.config, PathBuf::from("custom.toml")),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_sync_with_feed_url() {
        let cli = Cli::try_parse_from([
            "care-shim",
            "sync",
            "--feed-url",
            "http://localhost:9999/feed",
        ])
        .unwrap();
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.feed_url.as_deref(), Some("http://localhost:9999/feed"));
            }
            _ => panic!("Expected Sync command"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["care-shim", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Init(args)) => assert!(args.force),
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let config = load_config(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.store.batch_size, 10);
    }
}
