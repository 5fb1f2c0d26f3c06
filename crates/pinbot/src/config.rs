use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use pinbot_gateway_protocol::Emoji;
use serde::Deserialize;
use thiserror::Error;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "pinbot.yaml";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub emoji: EmojiConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load the config file. A missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Self = serde_saphyr::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pin = self.emoji.pin_emoji();
        let escalate = self.emoji.escalate_emoji();
        if pin.name().is_empty() || escalate.name().is_empty() {
            return Err(ConfigError::Invalid(
                "emoji.pin and emoji.escalate must not be empty".to_string(),
            ));
        }
        if pin == escalate {
            return Err(ConfigError::Invalid(
                "emoji.pin and emoji.escalate must differ".to_string(),
            ));
        }
        if self.gateway.event_buffer == 0 {
            return Err(ConfigError::Invalid(
                "gateway.event_buffer must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// EmojiConfig
// ============================================================================

/// Reaction emoji the policy reacts to.
///
/// Custom emoji are written as `name:id`, or in `<:name:id>` mention syntax.
#[derive(Debug, Clone, Deserialize)]
pub struct EmojiConfig {
    #[serde(default = "default_pin_emoji")]
    pub pin: String,
    #[serde(default = "default_escalate_emoji")]
    pub escalate: String,
}

impl Default for EmojiConfig {
    fn default() -> Self {
        Self {
            pin: default_pin_emoji(),
            escalate: default_escalate_emoji(),
        }
    }
}

impl EmojiConfig {
    pub fn pin_emoji(&self) -> Emoji {
        normalize_emoji(&self.pin)
    }

    pub fn escalate_emoji(&self) -> Emoji {
        normalize_emoji(&self.escalate)
    }
}

/// Reduce `<:name:id>` and `<a:name:id>` to the `name:id` form gateways report.
fn normalize_emoji(raw: &str) -> Emoji {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("<a:")
        .or_else(|| trimmed.strip_prefix("<:"))
        .and_then(|rest| rest.strip_suffix('>'));

    match inner {
        Some(custom) if custom.contains(':') => Emoji::new(custom),
        _ => Emoji::new(trimmed),
    }
}

fn default_pin_emoji() -> String {
    "📌".to_string()
}

fn default_escalate_emoji() -> String {
    "🔨".to_string()
}

// ============================================================================
// LogConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Log file path. Defaults to `<exe stem>.log` next to the executable.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
            console: default_console(),
        }
    }
}

impl LogConfig {
    /// The configured log file, or the path beside the running executable.
    pub fn resolve_file(&self) -> Option<PathBuf> {
        if let Some(file) = &self.file {
            return Some(file.clone());
        }
        let exe = std::env::current_exe().ok()?;
        default_log_file(&exe)
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_console() -> bool {
    true
}

/// `<dir>/<stem>.log` for the given executable path.
pub fn default_log_file(exe: &Path) -> Option<PathBuf> {
    let dir = exe.parent()?;
    let stem = exe.file_stem()?;
    let mut name = stem.to_os_string();
    name.push(".log");
    Some(dir.join(name))
}

// ============================================================================
// GatewayConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    /// Capacity of the event channel between gateway and dispatcher.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_event_buffer() -> usize {
    100
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
