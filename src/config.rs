//! Configuration for trigger patterns and summarization.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::provider::DEFAULT_MODEL;
use crate::trigger;

/// Error-detection settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TriggerConfig {
    /// Regex patterns that fire summarization when matched on stderr
    pub patterns: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            patterns: trigger::DEFAULT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Summarization settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SummaryConfig {
    /// Model identifier sent with the request
    pub model: String,
    /// Trailing characters of the log included in the prompt
    pub tail_chars: usize,
    /// Response token budget
    pub max_tokens: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            tail_chars: 3000,
            max_tokens: 1024,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub trigger: TriggerConfig,
    pub summary: SummaryConfig,
}

impl Config {
    /// Load config from file, returning default config if file doesn't exist
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| toml::from_str(&contents).ok())
            .unwrap_or_default()
    }

    /// Get the config file path (~/.config/bugsum/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("bugsum").join("config.toml"))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = env::var("BUGSUM_MODEL") {
            if !model.is_empty() {
                self.summary.model = model;
            }
        }
    }
}

/// Load `KEY=VALUE` lines from a `.env`-style file into the process
/// environment. Existing variables are never overwritten; a missing file
/// is not an error.
pub fn load_env_file(path: &Path) {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }
        env::set_var(key, value);
    }
}

/// Generate default config as TOML string
pub fn generate_default_config() -> String {
    r#"# bugsum configuration
# Place this file at ~/.config/bugsum/config.toml

[trigger]
# Regex patterns that fire summarization when matched on stderr
patterns = [
    "ReferenceError",
    "TypeError",
    "SyntaxError",
    "Unhandled",
    "Exception",
    "Error:",
]

[summary]
# Model identifier sent to the summarization service
model = "gpt-4o"

# Trailing characters of the log included in the prompt
tail_chars = 3000

# Response token budget
max_tokens = 1024

# Environment variable overrides:
# BUGSUM_MODEL   - overrides the model above
# OPENAI_API_KEY - service credential (may also come from ./.env)
"#
    .to_string()
}

/// Print the default config to stdout
pub fn print_default_config() {
    print!("{}", generate_default_config());
}
