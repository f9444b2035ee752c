//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! A file that cannot be read or parsed falls back to the defaults.

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Config file used when neither `--config` nor CONFIG_FILE is given
pub const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Deployment identifier, used as the metrics label
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "traffic-sim".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Requests for earlier years are rejected
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    /// Store queried when the request names none
    #[serde(default = "default_store")]
    pub default_store: String,
    /// Date queried when the request gives none
    #[serde(default = "default_year")]
    pub default_year: i32,
    #[serde(default = "default_month")]
    pub default_month: u32,
    #[serde(default = "default_day")]
    pub default_day: u32,
    /// Hour queried when the request gives none
    #[serde(default = "default_hour")]
    pub default_hour: u32,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_min_year() -> i32 {
    2020
}

fn default_store() -> String {
    "Nancy".to_string()
}

fn default_year() -> i32 {
    2021
}

fn default_month() -> u32 {
    1
}

fn default_day() -> u32 {
    25
}

fn default_hour() -> u32 {
    21
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
            min_year: default_min_year(),
            default_store: default_store(),
            default_year: default_year(),
            default_month: default_month(),
            default_day: default_day(),
            default_hour: default_hour(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Directory receiving one raw JSONL file per extracted date
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// File receiving the daily per-store totals
    #[serde(default = "default_daily_output")]
    pub daily_output: String,
}

fn default_output_dir() -> String {
    "data/raw".to_string()
}

fn default_daily_output() -> String {
    "data/daily.jsonl".to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { output_dir: default_output_dir(), daily_output: default_daily_output() }
    }
}

/// One store of the registry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    pub avg_visit: f64,
    pub std_visit: f64,
    #[serde(default)]
    pub perc_malfunction: f64,
    #[serde(default)]
    pub perc_break: f64,
}

impl StoreConfig {
    fn new(name: &str, avg_visit: f64, std_visit: f64, perc_malfunction: f64, perc_break: f64) -> Self {
        Self { name: name.to_string(), avg_visit, std_visit, perc_malfunction, perc_break }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default = "Config::default_stores")]
    pub stores: Vec<StoreConfig>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    bind_address: String,
    api_port: u16,
    min_year: i32,
    default_store: String,
    default_date: (i32, u32, u32),
    default_hour: u32,
    metrics_interval_secs: u64,
    output_dir: String,
    daily_output: String,
    stores: Vec<StoreConfig>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            min_year: default_min_year(),
            default_store: default_store(),
            default_date: (default_year(), default_month(), default_day()),
            default_hour: default_hour(),
            metrics_interval_secs: default_metrics_interval(),
            output_dir: default_output_dir(),
            daily_output: default_daily_output(),
            stores: Self::default_stores(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// The five stores served by the API.
    ///
    /// Fault rates are the ones the deployed service runs with.
    pub fn default_stores() -> Vec<StoreConfig> {
        vec![
            StoreConfig::new("Nancy", 3000.0, 500.0, 0.05, 0.05),
            StoreConfig::new("Paris", 8000.0, 800.0, 0.08, 0.1),
            StoreConfig::new("Lille", 6000.0, 500.0, 0.05, 0.08),
            StoreConfig::new("Cholet", 2000.0, 400.0, 0.02, 0.05),
            StoreConfig::new("Cabourg", 1700.0, 100.0, 0.0, 0.05),
        ]
    }

    /// Determine the config file path: command line, then CONFIG_FILE
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        Self::pick_config_path(cli_path, env::var("CONFIG_FILE").ok())
    }

    fn pick_config_path(cli_path: Option<&str>, env_path: Option<String>) -> String {
        match (cli_path, env_path) {
            (Some(path), _) => path.to_string(),
            (None, Some(path)) if !path.is_empty() => path,
            _ => DEFAULT_CONFIG_PATH.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            site_id: toml_config.site.id,
            bind_address: toml_config.api.bind_address,
            api_port: toml_config.api.port,
            min_year: toml_config.api.min_year,
            default_store: toml_config.api.default_store,
            default_date: (
                toml_config.api.default_year,
                toml_config.api.default_month,
                toml_config.api.default_day,
            ),
            default_hour: toml_config.api.default_hour,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            output_dir: toml_config.extract.output_dir,
            daily_output: toml_config.extract.daily_output,
            stores: toml_config.stores,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration - resolves the path from the command line or
    /// environment, then loads it
    pub fn load(cli_path: Option<&str>) -> Self {
        Self::load_from_path(&Self::resolve_config_path(cli_path))
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    pub fn min_year(&self) -> i32 {
        self.min_year
    }

    pub fn default_store(&self) -> &str {
        &self.default_store
    }

    /// Default (year, month, day) of a visitor count request
    pub fn default_date(&self) -> (i32, u32, u32) {
        self.default_date
    }

    pub fn default_hour(&self) -> u32 {
        self.default_hour
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn daily_output(&self) -> &str {
        &self.daily_output
    }

    pub fn stores(&self) -> &[StoreConfig] {
        &self.stores
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to replace the store registry
    pub fn with_stores(mut self, stores: Vec<StoreConfig>) -> Self {
        self.stores = stores;
        self
    }

}
