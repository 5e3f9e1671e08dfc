pub mod disk;
pub mod memory;

use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const RATES_COLLECTION: &str = "rates";

/// Durable key-value store rooted at the application data directory.
pub struct KeyValueStore {
    keyspace: Keyspace,
}

impl KeyValueStore {
    pub fn open(data_path: &Path) -> Result<Self> {
        let cache_dir = data_path.join("cache");
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create directory: {}", cache_dir.display()))?;
        let keyspace = fjall::Config::new(&cache_dir)
            .open()
            .with_context(|| format!("Failed to open store at {}", cache_dir.display()))?;
        debug!("Opened key-value store at {}", cache_dir.display());
        Ok(Self { keyspace })
    }

    pub fn collection(&self, name: &str) -> Result<Arc<dyn KeyValueCollection>> {
        let partition = self
            .keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open collection: {name}"))?;
        Ok(Arc::new(DiskCollection::new(self.keyspace.clone(), partition)))
    }
}

/// Opens the named durable collection, or an in-memory one when the store is
/// unusable. Reconciliation still works then, just without a cached fallback
/// across runs.
pub fn open_collection(data_path: Option<&Path>, name: &str) -> Arc<dyn KeyValueCollection> {
    let opened = data_path
        .context("No data directory available")
        .and_then(KeyValueStore::open)
        .and_then(|store| store.collection(name));

    match opened {
        Ok(collection) => collection,
        Err(e) => {
            warn!(error = %e, "Falling back to in-memory storage");
            Arc::new(MemoryCollection::new())
        }
    }
}
