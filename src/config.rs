use serde_derive::Deserialize;
use std::io::Read;
use std::time::Duration;
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::*;

pub const CHANNEL_SIZE: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error {0} when reading config")]
    IoError(#[from] std::io::Error),
    #[error("cannot open config file '{0}' : {1}")]
    OpeningError(PathBuf, std::io::Error),
    #[error("UTF8 format error when reading config")]
    Utf8Error,
    #[error("format error {0} when reading config")]
    FormatError(#[from] serde_yaml::Error),
    #[error("invalid listen timeout '{0}': {1}")]
    TimeoutError(String, humantime::DurationError),
}

#[derive(Clone, Deserialize)]
pub struct Listen {
    #[serde(default = "Listen::default_host")]
    pub host: String,
    #[serde(default = "Listen::default_port")]
    pub port: u16,
    pub concurrent: Option<usize>,
    /// Per request deadline, humantime formatted (`30s`, `1m 30s`)
    pub timeout: Option<String>,
}

impl Listen {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout
            .as_deref()
            .map(|t| {
                humantime::parse_duration(t).map_err(|e| ConfigError::TimeoutError(t.to_string(), e))
            })
            .transpose()
    }
}

impl Default for Listen {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            concurrent: None,
            timeout: None,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "CorsConfig::default_allowed_origin")]
    pub allowed_origin: String,
}

impl CorsConfig {
    fn default_allowed_origin() -> String {
        "http://localhost:3001".to_string()
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: Self::default_allowed_origin(),
        }
    }
}

#[derive(Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listen: Listen,
    #[serde(default)]
    pub cors: CorsConfig,
    pub log: Option<crate::log::Log>,
}

impl Config {
    pub fn from_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let mut file = File::open(p).map_err(|e| ConfigError::OpeningError(p.to_owned(), e))?;
        let mut contents = vec![];
        file.read_to_end(&mut contents)?;
        let contents = String::from_utf8(contents).map_err(|_| ConfigError::Utf8Error)?;
        let config = Config::from_str(&contents)?;
        // fail at startup rather than on the first request
        config.listen.timeout()?;
        Ok(config)
    }
}

pub mod testdata {
    use super::Config;

    #[allow(dead_code)]
    pub fn test_config() -> Config {
        Config::from_str(
            r#"
        log:
            level: trace
            structured: false
        listen:
            host: 127.0.0.1
            port: 3030
            concurrent: 10
            timeout: 30s
        cors:
            allowed_origin: "http://localhost:3001"
        "#,
        )
        .unwrap()
    }
}
