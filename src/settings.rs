use crate::storage::FileStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file that receives a copy of every log line.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Directory holding the saved dashboard. Uses the platform data
    /// directory when unset.
    #[serde(default)]
    pub state_dir: Option<String>,
    /// City shown by new weather widgets.
    #[serde(default = "default_city")]
    pub default_city: String,
    /// Currency the exchange rates are quoted against.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_rates_url")]
    pub rates_url: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Interval for weather and currency widgets to refresh themselves.
    /// `None` or `0` disables auto refresh.
    #[serde(default)]
    pub auto_refresh_secs: Option<u64>,
}

fn default_city() -> String {
    "Moscow".into()
}

fn default_base_currency() -> String {
    "RUB".into()
}

fn default_quote_url() -> String {
    "https://api.quotable.io/random".into()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".into()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".into()
}

fn default_rates_url() -> String {
    "https://api.exchangerate-api.com/v4/latest".into()
}

fn default_http_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            state_dir: None,
            default_city: default_city(),
            base_currency: default_base_currency(),
            quote_url: default_quote_url(),
            forecast_url: default_forecast_url(),
            geocoding_url: default_geocoding_url(),
            rates_url: default_rates_url(),
            http_timeout_secs: default_http_timeout(),
            auto_refresh_secs: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn auto_refresh(&self) -> Option<Duration> {
        self.auto_refresh_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Store for the dashboard snapshot.
    pub fn state_store(&self) -> FileStore {
        match self.state_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(dir) => FileStore::new(dir),
            None => FileStore::in_data_dir(),
        }
    }
}
