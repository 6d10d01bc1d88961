use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use resviz_core::is_culture_tag;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RESVIZ_DIR_NAME: &str = ".resviz";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_RESOURCE_EXTENSION: &str = "resx";
pub const DEFAULT_SOURCE_EXTENSION: &str = "cs";
pub const DEFAULT_TEXT_SIZE: u32 = 10;
pub const DEFAULT_FOREGROUND_COLOR: &str = "#808080";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
pub const DEFAULT_RELOAD_ATTEMPTS: u32 = 5;
pub const DEFAULT_RELOAD_BACKOFF_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResvizConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub preferred_culture: String,
    #[serde(default = "default_true")]
    pub support_namespace_aliases: bool,
    #[serde(default = "default_true")]
    pub support_localizer_syntax: bool,
    #[serde(default = "default_text_size")]
    pub text_size: u32,
    #[serde(default = "default_foreground_color")]
    pub foreground_color: String,
    #[serde(default)]
    pub top_padding: u32,
    #[serde(default)]
    pub bottom_padding: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preferred_culture: String::new(),
            support_namespace_aliases: true,
            support_localizer_syntax: true,
            text_size: DEFAULT_TEXT_SIZE,
            foreground_color: default_foreground_color(),
            top_padding: 0,
            bottom_padding: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_resource_extension")]
    pub resource_extension: String,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_reload_attempts")]
    pub reload_attempts: u32,
    #[serde(default = "default_reload_backoff_ms")]
    pub reload_backoff_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            resource_extension: default_resource_extension(),
            source_extension: default_source_extension(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reload_attempts: DEFAULT_RELOAD_ATTEMPTS,
            reload_backoff_ms: DEFAULT_RELOAD_BACKOFF_MS,
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reload_backoff(&self) -> Duration {
        Duration::from_millis(self.reload_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn resviz_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(RESVIZ_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    resviz_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<ResvizConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(ResvizConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: ResvizConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<ResvizConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(resviz_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = ResvizConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &ResvizConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let culture = config.display.preferred_culture.as_str();
    if !culture.is_empty() && !is_culture_tag(culture) {
        warnings.push(ConfigWarning {
            code: "display.preferred_culture",
            message: format!(
                "'{culture}' does not look like a culture tag; only neutral resources will match"
            ),
        });
    }

    if config.display.text_size == 0 {
        warnings.push(ConfigWarning {
            code: "display.text_size",
            message: "text_size is 0, hosts will not render any values".to_owned(),
        });
    }

    if !is_hex_color(&config.display.foreground_color) {
        warnings.push(ConfigWarning {
            code: "display.foreground_color",
            message: format!(
                "'{}' is not a #RRGGBB colour, hosts will use their default",
                config.display.foreground_color
            ),
        });
    }

    if config.watch.reload_attempts == 0 {
        warnings.push(ConfigWarning {
            code: "watch.reload_attempts",
            message: "reload_attempts is 0, changed resource files will never be reloaded"
                .to_owned(),
        });
    }

    warnings
}

fn default_true() -> bool {
    true
}

fn default_text_size() -> u32 {
    DEFAULT_TEXT_SIZE
}

fn default_foreground_color() -> String {
    DEFAULT_FOREGROUND_COLOR.to_owned()
}

fn default_resource_extension() -> String {
    DEFAULT_RESOURCE_EXTENSION.to_owned()
}

fn default_source_extension() -> String {
    DEFAULT_SOURCE_EXTENSION.to_owned()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_reload_attempts() -> u32 {
    DEFAULT_RELOAD_ATTEMPTS
}

fn default_reload_backoff_ms() -> u64 {
    DEFAULT_RELOAD_BACKOFF_MS
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|ch| ch.is_ascii_hexdigit()))
}

fn normalize_extension(value: &str, fallback: fn() -> String) -> String {
    let trimmed = value.trim().trim_start_matches('.').to_ascii_lowercase();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed
    }
}

fn normalize_config(mut config: ResvizConfig) -> ResvizConfig {
    config.display.preferred_culture = config.display.preferred_culture.trim().to_owned();
    config.display.foreground_color = config.display.foreground_color.trim().to_owned();

    config.watch.resource_extension = normalize_extension(
        &config.watch.resource_extension,
        default_resource_extension,
    );
    config.watch.source_extension =
        normalize_extension(&config.watch.source_extension, default_source_extension);

    config
}
