//! FILENAME: core/dataset/src/catalog.rs
//! PURPOSE: Named dataset loaders with an explicit, bounded cache.
//! CONTEXT: Callers register a loader per dataset name; the catalog never
//! reads anything itself. Loaded datasets are shared as `Arc<Dataset>` and
//! evicted least-recently-used once `capacity` is exceeded.

use std::fmt;
use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::dataset::Dataset;
use crate::error::DatasetError;

pub type DatasetLoader = Box<dyn Fn() -> Result<Dataset, DatasetError> + Send + Sync>;

pub const DEFAULT_CATALOG_CAPACITY: usize = 4;

pub struct DatasetCatalog {
    capacity: usize,
    loaders: FxHashMap<String, DatasetLoader>,
    /// Registration order, for listing.
    names: Vec<String>,
    /// Loaded datasets, least recently used first.
    cached: Vec<(String, Arc<Dataset>)>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CATALOG_CAPACITY)
    }

    /// A capacity of 0 disables caching: every `get` calls the loader.
    pub fn with_capacity(capacity: usize) -> Self {
        DatasetCatalog {
            capacity,
            loaders: FxHashMap::default(),
            names: Vec::new(),
            cached: Vec::new(),
        }
    }

    /// Registers (or replaces) a loader. Replacing drops any cached copy.
    pub fn register<F>(&mut self, name: &str, loader: F)
    where
        F: Fn() -> Result<Dataset, DatasetError> + Send + Sync + 'static,
    {
        if self.loaders.insert(name.to_string(), Box::new(loader)).is_none() {
            self.names.push(name.to_string());
        }
        self.invalidate(name);
    }

    /// Names of every registered dataset, in registration order.
    pub fn available(&self) -> &[String] {
        &self.names
    }

    /// Returns the dataset, loading it on a cache miss.
    pub fn get(&mut self, name: &str) -> Result<Arc<Dataset>, DatasetError> {
        if let Some(pos) = self.cached.iter().position(|(n, _)| n == name) {
            let entry = self.cached.remove(pos);
            let dataset = Arc::clone(&entry.1);
            self.cached.push(entry);
            return Ok(dataset);
        }

        let loader = self
            .loaders
            .get(name)
            .ok_or_else(|| DatasetError::UnknownDataset(name.to_string()))?;
        let dataset = Arc::new(loader()?);
        debug!("[DatasetCatalog] loaded '{}' ({} rows)", name, dataset.row_count());

        if self.capacity > 0 {
            if self.cached.len() >= self.capacity {
                let (evicted, _) = self.cached.remove(0);
                debug!("[DatasetCatalog] evicted '{}'", evicted);
            }
            self.cached.push((name.to_string(), Arc::clone(&dataset)));
        }
        Ok(dataset)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cached.iter().any(|(n, _)| n == name)
    }

    /// Drops the cached copy so the next `get` reloads it.
    pub fn invalidate(&mut self, name: &str) {
        self.cached.retain(|(n, _)| n != name);
    }

    pub fn clear(&mut self) {
        self.cached.clear();
    }
}

impl Default for DatasetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DatasetCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetCatalog")
            .field("capacity", &self.capacity)
            .field("available", &self.names)
            .field("cached", &self.cached.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}
