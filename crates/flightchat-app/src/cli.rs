//! CLI argument definitions for the flightchat server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Default API port when neither CLI, env, nor config names one.
const DEFAULT_PORT: u16 = 7860;

/// FlightChat: a conversational flight search assistant.
#[derive(Parser, Debug)]
#[command(name = "flightchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory for cached images and audio.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Priority: --config flag > FLIGHTCHAT_CONFIG env var > ~/.flightchat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("FLIGHTCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --port flag > FLIGHTCHAT_PORT env var > config file value > 7860.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("FLIGHTCHAT_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        DEFAULT_PORT
    }

    /// `None` when not overridden on the command line.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".flightchat").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
