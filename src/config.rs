use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::post::PostStatus;
use crate::{converter, ghost};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    pub ghost: GhostConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GhostConfig {
    pub api_url: String,
    pub admin_api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub status: PostStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_converter_timeout")]
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_converter_timeout(),
        }
    }
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GhostConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_api_version() -> String {
    ghost::DEFAULT_API_VERSION.to_string()
}

fn default_http_timeout() -> u64 {
    ghost::DEFAULT_TIMEOUT.as_secs()
}

fn default_program() -> String {
    converter::DEFAULT_PROGRAM.to_string()
}

fn default_converter_timeout() -> u64 {
    converter::DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    pub fn new() -> Result<Self> {
        dotenv().ok();

        // First try to load from environment variables
        if let Some(config) = Self::from_vars(|name| std::env::var(name).ok())? {
            return Ok(config);
        }

        // If env vars not set, try to load from config file
        Self::from_file()
    }

    /// Builds a config from `lookup`. Returns `Ok(None)` when the Ghost
    /// connection variables are absent so the caller can fall back to a file.
    pub fn from_vars<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (Some(api_url), Some(admin_api_key)) =
            (lookup("GHOST_API_URL"), lookup("GHOST_ADMIN_API_KEY"))
        else {
            return Ok(None);
        };

        let status = match lookup("POST_STATUS").filter(|s| !s.is_empty()) {
            Some(status) => status.parse()?,
            None => PostStatus::default(),
        };

        Ok(Some(Config {
            input: InputConfig {
                data_path: lookup("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_data_path),
            },
            ghost: GhostConfig {
                api_url,
                admin_api_key,
                api_version: lookup("GHOST_API_VERSION").unwrap_or_else(default_api_version),
                timeout_secs: parse_secs(&lookup, "HTTP_TIMEOUT_SECS", default_http_timeout())?,
            },
            publish: PublishConfig { status },
            converter: ConverterConfig {
                program: lookup("PANDOC_PATH").unwrap_or_else(default_program),
                timeout_secs: parse_secs(
                    &lookup,
                    "CONVERTER_TIMEOUT_SECS",
                    default_converter_timeout(),
                )?,
            },
        }))
    }

    fn from_file() -> Result<Self> {
        let config_paths = vec!["md2ghost.toml", "config.toml", "Config.toml"];

        for path in config_paths {
            if let Ok(content) = std::fs::read_to_string(path) {
                return Self::from_toml(&content).with_context(|| format!("Invalid {}", path));
            }
        }

        Err(anyhow!(
            "No configuration found: set GHOST_API_URL and GHOST_ADMIN_API_KEY or provide md2ghost.toml"
        ))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn parse_secs<F>(lookup: &F, name: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", name, value)),
        None => Ok(default),
    }
}
