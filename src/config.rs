use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::core::{DEFAULT_LOOKBACK_DAYS, DEFAULT_SEARCH_BUDGET};
use crate::models::{MentionStyle, OddPolicy};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub slack: SlackSettings,
    #[serde(default)]
    pub pairing: PairingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct SlackSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    pub token: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Where dry runs are posted; dry runs post nothing when unset
    pub test_channel: Option<String>,
    pub timeout_secs: Option<u64>,
}

fn default_api_base_url() -> String { "https://slack.com/api".to_string() }
fn default_channel() -> String { "#randomcoffees".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct PairingSettings {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default)]
    pub odd_policy: OddPolicy,
    #[serde(default)]
    pub mention_style: MentionStyle,
    #[serde(default = "default_search_budget")]
    pub search_budget: usize,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            odd_policy: OddPolicy::default(),
            mention_style: MentionStyle::default(),
            search_budget: default_search_budget(),
        }
    }
}

fn default_lookback_days() -> i64 { DEFAULT_LOOKBACK_DAYS }
fn default_search_budget() -> usize { DEFAULT_SEARCH_BUDGET }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with COFFEE_)
    /// 5. SLACK_API_TOKEN for the bot token
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., COFFEE__SLACK__CHANNEL -> slack.channel
            .add_source(env_source())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Parse configuration from TOML text, without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("COFFEE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply well-known environment variables that live outside the COFFEE_ prefix
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(token) = std::env::var("SLACK_API_TOKEN") {
        builder = builder.set_override("slack.token", token)?;
    }

    builder.build()
}
