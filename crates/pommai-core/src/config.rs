use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PommaiError, Result};

/// Top-level configuration for the Pommai application.
///
/// Loaded from `~/.pommai/config.toml` by default. Each section corresponds
/// to one subsystem; every section falls back to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PommaiConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl PommaiConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PommaiConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PommaiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Directory holding `commands.json`, `letters.json` and `words.json`.
    pub vocabulary_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            vocabulary_dir: "assets".to_string(),
        }
    }
}

/// Trigger matching thresholds.
///
/// The partial-match floors are empirical: single-syllable command fragments
/// produce false positives, while single glyphs are the expected letter unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum normalized length of a letter trigger for substring matching.
    pub letter_min_partial_len: usize,
    /// Minimum normalized length of a command trigger for substring matching.
    pub command_min_partial_len: usize,
    /// Suffix morpheme stripped from letter names to derive a shorter trigger.
    pub letter_name_suffix: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            letter_min_partial_len: 1,
            command_min_partial_len: 4,
            letter_name_suffix: "கரம்".to_string(),
        }
    }
}

/// Hints handed to the recognizer capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// BCP-47 language tag, e.g. "ta-IN".
    pub language: String,
    /// Whether the recognizer should emit interim (non-final) results.
    pub interim_results: bool,
    /// Number of alternatives requested per result.
    pub max_alternatives: u32,
    /// Whether the recognizer runs in its own continuous mode. The session
    /// controller restarts a single-shot recognizer, so this stays off.
    pub continuous: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "ta-IN".to_string(),
            interim_results: true,
            max_alternatives: 1,
            continuous: false,
        }
    }
}

/// Restart policy and timing for the recognition session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Restart delay after a natural end of utterance.
    pub end_restart_ms: u64,
    /// Restart delay after the recognizer reports an external abort.
    pub aborted_restart_ms: u64,
    /// Restart delay after the recognizer heard no speech.
    pub no_speech_restart_ms: u64,
    /// Restart delay after any other recognizer fault.
    pub error_restart_ms: u64,
    /// Retry delay when the recognizer refuses to start.
    pub start_retry_ms: u64,
    /// Quiet period after a final result before it is resolved.
    pub result_debounce_ms: u64,
    /// How long a transient status message stays relevant.
    pub status_message_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            end_restart_ms: 100,
            aborted_restart_ms: 500,
            no_speech_restart_ms: 1000,
            error_restart_ms: 2000,
            start_retry_ms: 1000,
            result_debounce_ms: 500,
            status_message_ms: 3000,
        }
    }
}

impl SessionConfig {
    pub fn end_restart_delay(&self) -> Duration {
        Duration::from_millis(self.end_restart_ms)
    }

    pub fn aborted_restart_delay(&self) -> Duration {
        Duration::from_millis(self.aborted_restart_ms)
    }

    pub fn no_speech_restart_delay(&self) -> Duration {
        Duration::from_millis(self.no_speech_restart_ms)
    }

    pub fn error_restart_delay(&self) -> Duration {
        Duration::from_millis(self.error_restart_ms)
    }

    pub fn start_retry_delay(&self) -> Duration {
        Duration::from_millis(self.start_retry_ms)
    }

    pub fn result_debounce(&self) -> Duration {
        Duration::from_millis(self.result_debounce_ms)
    }

    pub fn status_message_duration(&self) -> Duration {
        Duration::from_millis(self.status_message_ms)
    }
}
