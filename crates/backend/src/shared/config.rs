use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dashboards::d402_sales_analytics::service::DashboardSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_top_products")]
    pub top_products: usize,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_products: default_top_products(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl From<&DashboardConfig> for DashboardSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            top_products: config.top_products,
            preview_rows: config.preview_rows,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_top_products() -> usize {
    10
}

fn default_preview_rows() -> usize {
    100
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[dataset]
path = "sales_data.csv"

[server]
port = 3000

[dashboard]
top_products = 10
preview_rows = 100
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    // Try to find config.toml next to the executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                return parse_config(&contents);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    // Fall back to default config
    tracing::info!("Using default embedded configuration");
    parse_config(DEFAULT_CONFIG)
}

fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    Ok(config)
}

/// Get the sales CSV path from configuration.
/// Relative paths resolve against the executable directory when the file
/// is there, otherwise against the working directory.
pub fn get_dataset_path(config: &Config) -> PathBuf {
    let dataset_path = Path::new(&config.dataset.path);

    // If absolute path, use as is
    if dataset_path.is_absolute() {
        return dataset_path.to_path_buf();
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let resolved_path = exe_dir.join(dataset_path);
            if resolved_path.exists() {
                return resolved_path;
            }
        }
    }

    // Fallback: use relative to current directory
    dataset_path.to_path_buf()
}
