use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::listing::DEFAULT_PAGE_SIZE;

pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.com/v3.1";
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Countries directory endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountriesConfig {
    pub base_url: String,
}

impl Default for CountriesConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COUNTRIES_URL.to_string(),
        }
    }
}

/// Weather provider endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
            api_key: None,
        }
    }
}

/// Authentication/data platform project and the tables the views read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub test_table: String,
    pub protected_table: String,
    pub favorites_table: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            test_table: "test_data".to_string(),
            protected_table: "protected_data".to_string(),
            favorites_table: "favorites".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [weather]
/// api_key = "..."
///
/// [platform]
/// url = "https://xyzcompany.supabase.co"
/// anon_key = "..."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub countries: CountriesConfig,
    pub weather: WeatherConfig,
    pub platform: PlatformConfig,
    pub listing: ListingConfig,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        if cfg.listing.page_size == 0 {
            return Err(anyhow!("listing.page_size must be at least 1"));
        }
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Override file values with `OPENWEATHER_API_KEY`, `SUPABASE_URL` and
    /// `SUPABASE_ANON_KEY` when they are set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(url) = non_empty("SUPABASE_URL") {
            self.platform.url = Some(url);
        }
        if let Some(key) = non_empty("SUPABASE_ANON_KEY") {
            self.platform.anon_key = Some(key);
        }
    }

    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather.api_key.as_deref()
    }

    pub fn set_weather_api_key(&mut self, api_key: String) {
        self.weather.api_key = Some(api_key);
    }

    pub fn set_platform(&mut self, url: String, anon_key: String) {
        self.platform.url = Some(url);
        self.platform.anon_key = Some(anon_key);
    }

    pub fn is_platform_configured(&self) -> bool {
        self.platform.url.is_some() && self.platform.anon_key.is_some()
    }
}

pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "countries-explorer", "countries")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
