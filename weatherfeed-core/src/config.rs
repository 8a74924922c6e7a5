use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    model::{TemperatureUnit, WeatherQuery},
    ops::{DEFAULT_POLL_INTERVAL, MAX_POLL_INTERVAL},
};

pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_LOCATION: &str = "London,uk";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// location = "London,uk"
/// pair_location = "Paris,fr"
/// units = "metric"
/// poll_interval_secs = 3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub location: String,

    /// Second location for paired fetches; falls back to `location`.
    pub pair_location: Option<String>,

    pub api_key: Option<String>,
    pub units: TemperatureUnit,
    pub poll_interval_secs: u64,

    /// Client-wide request timeout. Library default when absent.
    pub timeout_secs: Option<u64>,

    /// Worker threads of the runtime. Runtime default when absent.
    pub workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            pair_location: None,
            api_key: None,
            units: TemperatureUnit::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            timeout_secs: None,
            workers: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherfeed", "weatherfeed")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn pair_location(&self) -> &str {
        self.pair_location.as_deref().unwrap_or(&self.location)
    }

    /// Configured polling period, clamped to 1s ..= [`MAX_POLL_INTERVAL`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.clamp(1, MAX_POLL_INTERVAL.as_secs()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid weather endpoint '{}'", self.endpoint))
    }

    /// Query for the configured location.
    pub fn query(&self) -> Result<WeatherQuery> {
        self.query_for(&self.location)
    }

    pub fn query_for(&self, location: &str) -> Result<WeatherQuery> {
        let api_key = self.api_key().ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weatherfeed configure` or pass --api-key."
            )
        })?;

        if location.trim().is_empty() {
            return Err(anyhow!("Location must not be empty"));
        }

        Ok(WeatherQuery::new(self.endpoint_url()?, location, api_key).with_units(self.units))
    }
}
