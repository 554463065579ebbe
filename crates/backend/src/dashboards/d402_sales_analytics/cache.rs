use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use super::error::DataFormatError;
use super::loader;
use super::model::{FilterOptions, SalesTable};

/// Loaded table together with its option lists, both computed once per load
#[derive(Debug)]
pub struct Dataset {
    pub table: SalesTable,
    pub options: FilterOptions,
}

impl Dataset {
    pub fn new(table: SalesTable) -> Self {
        let options = FilterOptions::from_table(&table);
        Self { table, options }
    }
}

/// Identity of a source file at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceFingerprint {
    pub fn of(path: &Path) -> Result<Self, DataFormatError> {
        let metadata = std::fs::metadata(path).map_err(|source| DataFormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct CacheEntry {
    fingerprint: SourceFingerprint,
    dataset: Arc<Dataset>,
}

/// Memoized dataset loads keyed on source path.
///
/// An entry is reused while the file keeps the same length and modification
/// time; any change triggers a reload on the next [`DatasetCache::get`].
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Result<Arc<Dataset>, DataFormatError> {
        let fingerprint = SourceFingerprint::of(path)?;

        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = entries.get(path) {
                if entry.fingerprint == fingerprint {
                    tracing::debug!("D402: dataset cache hit for {}", path.display());
                    return Ok(Arc::clone(&entry.dataset));
                }
                tracing::info!("D402: {} changed on disk, reloading", path.display());
            }
        }

        // A failed load leaves the previous entry in place
        let dataset = Arc::new(Dataset::new(loader::load(path)?));

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            path.to_path_buf(),
            CacheEntry {
                fingerprint,
                dataset: Arc::clone(&dataset),
            },
        );
        Ok(dataset)
    }

    /// Forget one source; returns true if it was cached
    pub fn invalidate(&self, path: &Path) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(path).is_some()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Order_Date,Category,Product,Region,Customer_Segment,Payment_Method,Quantity,Final_Price,Discount_Amount,Discount_Percent";

    fn write_csv(rows: &[&str]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(tmp, "{}", row).unwrap();
        }
        tmp.flush().unwrap();
        tmp
    }

    #[test]
    fn test_repeated_get_returns_same_dataset() {
        let tmp = write_csv(&["2024-01-05,A,P1,West,Consumer,Cash,1,100,0,0"]);
        let cache = DatasetCache::new();

        let first = cache.get(tmp.path()).unwrap();
        let second = cache.get(tmp.path()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.table.len(), 1);
        assert_eq!(first.options.categories, vec!["A"]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_changed_source_is_reloaded() {
        let mut tmp = write_csv(&["2024-01-05,A,P1,West,Consumer,Cash,1,100,0,0"]);
        let cache = DatasetCache::new();
        let first = cache.get(tmp.path()).unwrap();

        writeln!(tmp, "2024-02-10,B,P2,East,Corporate,Cash,1,50,0,0").unwrap();
        tmp.flush().unwrap();

        let second = cache.get(tmp.path()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.table.len(), 2);
        assert_eq!(first.table.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let tmp = write_csv(&["2024-01-05,A,P1,West,Consumer,Cash,1,100,0,0"]);
        let cache = DatasetCache::new();

        let first = cache.get(tmp.path()).unwrap();
        assert!(cache.invalidate(tmp.path()));
        assert!(!cache.invalidate(tmp.path()));
        assert!(cache.is_empty());

        let second = cache.get(tmp.path()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn test_sources_are_cached_independently() {
        let a = write_csv(&["2024-01-05,A,P1,West,Consumer,Cash,1,100,0,0"]);
        let b = write_csv(&[
            "2024-01-05,B,P1,West,Consumer,Cash,1,100,0,0",
            "2024-01-06,C,P2,West,Consumer,Cash,1,100,0,0",
        ]);
        let cache = DatasetCache::new();

        assert_eq!(cache.get(a.path()).unwrap().table.len(), 1);
        assert_eq!(cache.get(b.path()).unwrap().table.len(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let tmp = write_csv(&["bad-date,A,P1,West,Consumer,Cash,1,100,0,0"]);
        let cache = DatasetCache::new();

        assert!(matches!(
            cache.get(tmp.path()),
            Err(DataFormatError::InvalidDate { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_reload_keeps_previous_entry() {
        let tmp = write_csv(&["2024-01-05,A,P1,West,Consumer,Cash,1,100,0,0"]);
        let original = std::fs::read(tmp.path()).unwrap();
        let original_mtime = std::fs::metadata(tmp.path()).unwrap().modified().unwrap();
        let cache = DatasetCache::new();
        let first = cache.get(tmp.path()).unwrap();

        // Different length so the fingerprint changes regardless of mtime granularity
        std::fs::write(
            tmp.path(),
            format!("{}\nbad-date,A,P1,West,Consumer,Cash,1,100,0,0\n", HEADER),
        )
        .unwrap();
        assert!(matches!(
            cache.get(tmp.path()),
            Err(DataFormatError::InvalidDate { .. })
        ));
        assert_eq!(cache.len(), 1);

        std::fs::write(tmp.path(), &original).unwrap();
        std::fs::File::options()
            .write(true)
            .open(tmp.path())
            .unwrap()
            .set_modified(original_mtime)
            .unwrap();

        let again = cache.get(tmp.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let cache = DatasetCache::new();
        let result = cache.get(Path::new("/definitely/not/here/sales_data.csv"));
        assert!(matches!(result, Err(DataFormatError::Io { .. })));
    }
}
