use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WebpilotError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Browser launch configuration
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Defaults applied to a freshly created page
    #[serde(default)]
    pub context: ContextConfig,

    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            context: ContextConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Browser executable path (overrides auto-discovery)
    pub executable: Option<String>,

    /// Remote debugging port used for launched browsers
    #[serde(default = "default_cdp_port")]
    pub cdp_port: u16,

    /// Launch in headless mode
    #[serde(default)]
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            cdp_port: default_cdp_port(),
            headless: false,
        }
    }
}

fn default_cdp_port() -> u16 {
    9222
}

/// Fixed context defaults for new pages. These are configuration, not
/// per-call parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            locale: default_locale(),
            timezone: default_timezone(),
        }
    }
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

fn default_locale() -> String {
    "zh-CN".to_string()
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory screenshots are written to
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

fn default_screenshot_dir() -> String {
    std::env::temp_dir().to_string_lossy().into_owned()
}

impl Config {
    /// Load configuration from all sources (defaults, file, WEBPILOT_* env)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("WEBPILOT_").split("_"))
            .extract()
            .map_err(|e| WebpilotError::ConfigError(e.to_string()))?;

        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webpilot")
            .join("config.toml")
    }

    /// Screenshot directory with `~` expanded
    pub fn screenshot_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output.screenshot_dir).to_string())
    }
}
