use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub forecast: ForecastConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        // Tuning runs take minutes on the backend
        Self {
            request_timeout_secs: 300,
            connect_timeout_secs: 10,
        }
    }
}

/// Default form values for a new submission.
#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    pub forecast_hours: String,
    pub window_sizes: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            forecast_hours: "36".to_string(),
            window_sizes: "72".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Where downloads land. Falls back to the user's download directory.
    pub output_dir: Option<PathBuf>,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            chart_width: 1280,
            chart_height: 720,
        }
    }
}

impl ExportConfig {
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("forecast-console");

        let builder = Config::builder()
            // 1. Load default values
            // Server
            .set_default("server.base_url", "http://localhost:8000")?
            // Network
            .set_default("network.request_timeout_secs", 300)?
            .set_default("network.connect_timeout_secs", 10)?
            // Forecast form
            .set_default("forecast.forecast_hours", "36")?
            .set_default("forecast.window_sizes", "72")?
            // Export
            .set_default("export.output_dir", None::<String>)?
            .set_default("export.chart_width", 1280)?
            .set_default("export.chart_height", 720)?

            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))

            // 4. Load from Environment variables (FORECAST__SERVER__BASE_URL=...)
            .add_source(Environment::with_prefix("FORECAST").separator("__"));

        let s = builder.build().context("Failed to build configuration")?;
        s.try_deserialize().context("Failed to parse configuration")
    }
}
