//! Server configuration loading from file and environment variables.

use huddle_bot::{BotSettings, CallMode, SilenceSettings, DEFAULT_GREETING};
use huddle_types::AudioLevel;
use huddle_voice::SpeechConfig;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bot identity and call handling.
    #[serde(default)]
    pub bot: BotConfig,

    /// Silence detection.
    #[serde(default)]
    pub silence: SilenceConfig,

    /// Speech synthesis service.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Conferencing platform gateway.
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "huddle_bot=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// The bot's own user id on the platform.
    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub mode: CallMode,

    /// Text posted into conversations the bot is added to.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SilenceConfig {
    #[serde(default = "default_threshold_samples")]
    pub threshold_samples: u32,

    #[serde(default = "default_loudness_threshold")]
    pub loudness_threshold: AudioLevel,

    #[serde(default = "default_sampling_period_ms")]
    pub sampling_period_ms: u64,
}

/// Conferencing platform gateway settings.
#[derive(Clone, Deserialize)]
pub struct PlatformConfig {
    /// Gateway base URL, e.g. `http://127.0.0.1:8080/v1`.
    #[serde(default = "default_platform_url")]
    pub base_url: String,

    /// Sent as a bearer token when present.
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_platform_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_threshold_samples() -> u32 {
    5
}

fn default_loudness_threshold() -> AudioLevel {
    50
}

fn default_sampling_period_ms() -> u64 {
    1000
}

fn default_platform_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_platform_timeout_seconds() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            mode: CallMode::default(),
            greeting: default_greeting(),
        }
    }
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_samples: default_threshold_samples(),
            loudness_threshold: default_loudness_threshold(),
            sampling_period_ms: default_sampling_period_ms(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_platform_url(),
            api_token: None,
            timeout_seconds: default_platform_timeout_seconds(),
        }
    }
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Config {
    /// Settings for the call state machine.
    pub fn bot_settings(&self) -> BotSettings {
        let mut settings = BotSettings::new(self.bot.user_id.clone());
        settings.mode = self.bot.mode;
        settings.greeting = self.bot.greeting.clone();
        settings.silence = SilenceSettings {
            threshold_samples: self.silence.threshold_samples,
            loudness_threshold: self.silence.loudness_threshold,
            sampling_period: Duration::from_millis(self.silence.sampling_period_ms),
        };
        settings.voice = self.speech.profile.clone();
        settings
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.silence.threshold_samples == 0 {
            return Err(ConfigError::Invalid(
                "silence.threshold_samples must be at least 1".to_string(),
            ));
        }
        if self.silence.sampling_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "silence.sampling_period_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HUDDLE_HOST` overrides `server.host`
/// - `HUDDLE_PORT` overrides `server.port`
/// - `HUDDLE_LOG_LEVEL` overrides `logging.level`
/// - `HUDDLE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `HUDDLE_BOT_USER_ID` overrides `bot.user_id`
/// - `HUDDLE_MODE` overrides `bot.mode` (`single` or `multi`)
/// - `HUDDLE_SPEECH_URL` overrides `speech.url`
/// - `HUDDLE_SPEECH_API_KEY` overrides `speech.api_key`
/// - `HUDDLE_PLATFORM_URL` overrides `platform.base_url`
/// - `HUDDLE_PLATFORM_TOKEN` overrides `platform.api_token`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the resulting silence settings are unusable.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("HUDDLE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("HUDDLE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = var("HUDDLE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("HUDDLE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(user_id) = var("HUDDLE_BOT_USER_ID") {
        config.bot.user_id = user_id;
    }
    if let Some(mode) = var("HUDDLE_MODE") {
        match mode.parse() {
            Ok(parsed) => config.bot.mode = parsed,
            Err(e) => tracing::warn!("ignoring HUDDLE_MODE: {}", e),
        }
    }
    if let Some(url) = var("HUDDLE_SPEECH_URL") {
        config.speech.url = url;
    }
    if let Some(key) = var("HUDDLE_SPEECH_API_KEY") {
        config.speech.api_key = Some(key);
    }
    if let Some(url) = var("HUDDLE_PLATFORM_URL") {
        config.platform.base_url = url;
    }
    if let Some(token) = var("HUDDLE_PLATFORM_TOKEN") {
        config.platform.api_token = Some(token);
    }
}
