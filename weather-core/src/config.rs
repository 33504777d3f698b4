use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{error::ConfigError, model::Coordinate};

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weatherapi.com";
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "WeatherApp/1.0";

/// Environment variable that overrides the stored weatherapi.com key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Forecast API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub forecast_days: u8,
    pub timeout_secs: u64,
    /// Extra attempts after a non-successful HTTP response.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one. Zero retries immediately.
    pub retry_delay_ms: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            forecast_days: 3,
            timeout_secs: 30,
            max_retries: 1,
            retry_delay_ms: 0,
        }
    }
}

impl WeatherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Nominatim settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingSettings {
    pub base_url: String,
    pub user_agent: String,
    pub min_request_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_request_interval_ms: 1000,
            timeout_secs: 30,
        }
    }
}

impl GeocodingSettings {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Suggestion box tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub min_query_chars: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { debounce_ms: 500, min_query_chars: 2 }
    }
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Fixed position used in place of a GPS fix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationSettings {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude?, self.longitude?))
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [weather]
/// api_key = "..."
/// forecast_days = 3
///
/// [location]
/// latitude = 51.5
/// longitude = -0.12
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub weather: WeatherSettings,
    pub geocoding: GeocodingSettings,
    pub search: SearchSettings,
    pub location: LocationSettings,
}

impl Config {
    /// Load config from the platform config dir, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;

        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    /// Save config to the platform config dir.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io { path: path.display().to_string(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(io_err)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or(ConfigError::NoConfigDir)?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.weather.api_key = Some(api_key);
    }

    /// Stored key unless `env_value` (normally `$WEATHER_API_KEY`) is set and non-empty.
    pub fn with_api_key_override(mut self, env_value: Option<String>) -> Self {
        if let Some(key) = env_value.filter(|k| !k.trim().is_empty()) {
            self.weather.api_key = Some(key);
        }
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.weather.api_key.as_deref().filter(|k| !k.is_empty())
    }
}
