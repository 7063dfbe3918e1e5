//! CLI argument definitions for the Pommai application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Pommai: Tamil voice commands for an animated character.
#[derive(Parser, Debug)]
#[command(name = "pommai", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Directory holding commands.json, letters.json and words.json.
    #[arg(short = 'v', long = "vocab-dir")]
    pub vocab_dir: Option<PathBuf>,

    /// Resolve a single transcript, print the result as JSON and exit.
    #[arg(long = "once", value_name = "TEXT")]
    pub once: Option<String>,

    /// Write the default configuration to the config path and exit.
    #[arg(long = "init-config", conflicts_with = "once")]
    pub init_config: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > POMMAI_CONFIG env var > ~/.pommai/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("POMMAI_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the vocabulary directory.
    ///
    /// Priority: --vocab-dir flag > config file value. A leading `~/` is
    /// expanded to the home directory.
    pub fn resolve_vocab_dir(&self, config_dir: &str) -> PathBuf {
        match self.vocab_dir {
            Some(ref p) => p.clone(),
            None => expand_home(config_dir),
        }
    }

    /// Resolve the log level. Returns `None` if not overridden.
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

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".pommai").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
