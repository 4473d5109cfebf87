//! Configuration file support.
//!
//! Settings come from `windscope.toml` (or the file given with `--config`),
//! then `WINDSCOPE_SERVICE_URL`, then command-line flags, each overriding
//! the previous. Every key is optional.
//!
//! ```toml
//! [service]
//! base_url = "https://analysis.example.com"
//!
//! [report]
//! dir = "windscope-reports"
//!
//! [serve]
//! port = 3001
//! ```

use crate::error::ConfigError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "windscope.toml";
pub const SERVICE_URL_ENV: &str = "WINDSCOPE_SERVICE_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub serve: ServeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_report_dir")]
    pub dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServeSettings {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("windscope-reports")
}

fn default_port() -> u16 {
    3001
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// An explicit path must exist; otherwise `windscope.toml` in the
    /// current directory is used when present, and defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.apply_env(std::env::var(SERVICE_URL_ENV).ok());
        Ok(config)
    }

    /// Apply the environment override. Split out so tests need not touch
    /// the process environment.
    pub fn apply_env(&mut self, service_url: Option<String>) {
        if let Some(url) = service_url.filter(|u| !u.trim().is_empty()) {
            self.service.base_url = url;
        }
    }

    pub fn service_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.service.base_url).map_err(|e| ConfigError::ServiceUrl {
            url: self.service.base_url.clone(),
            message: e.to_string(),
        })
    }
}
