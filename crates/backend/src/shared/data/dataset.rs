use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dashboards::d402_sales_analytics::cache::{Dataset, DatasetCache};
use crate::dashboards::d402_sales_analytics::service::DashboardSettings;
use crate::dashboards::d402_sales_analytics::SalesError;

static DATASET: OnceCell<DatasetSource> = OnceCell::new();

/// Configured sales CSV together with its load cache
#[derive(Debug)]
pub struct DatasetSource {
    path: PathBuf,
    settings: DashboardSettings,
    cache: DatasetCache,
}

impl DatasetSource {
    pub fn new(path: PathBuf, settings: DashboardSettings) -> Self {
        Self {
            path,
            settings,
            cache: DatasetCache::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// Current table, reloaded only when the file changed since the last call
    pub fn dataset(&self) -> Result<Arc<Dataset>, SalesError> {
        Ok(self.cache.get(&self.path)?)
    }
}

/// Register the dataset used by the HTTP handlers. May be called once.
pub fn initialize_dataset(path: PathBuf, settings: DashboardSettings) -> anyhow::Result<()> {
    tracing::info!("Dataset source: {}", path.display());
    DATASET
        .set(DatasetSource::new(path, settings))
        .map_err(|_| anyhow::anyhow!("dataset has already been initialized"))
}

pub fn get_source() -> Result<&'static DatasetSource, SalesError> {
    DATASET.get().ok_or(SalesError::NotInitialized)
}

/// Shortcut for `get_source()?.dataset()`
pub fn current() -> Result<Arc<Dataset>, SalesError> {
    get_source()?.dataset()
}
