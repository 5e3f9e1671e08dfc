use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::debug;

/// Collection backed by a fjall partition. Every write is synced so the value
/// survives the process.
pub struct DiskCollection {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.partition.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.partition.insert(key.as_bytes(), value.as_bytes())?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.partition.remove(key.as_bytes())?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &str) -> Option<String> {
        match self.read(key) {
            Ok(Some(value)) => {
                debug!("Cache HIT for key: {}", key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache MISS for key: {}", key);
                None
            }
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &str, value: String) {
        match self.write(key, &value) {
            Ok(()) => debug!("Cache PUT for key: {}", key),
            Err(e) => debug!("DiskCollection put error: {}", e),
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.delete(key) {
            debug!("DiskCollection remove error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::cache::KeyValueCollection;
    use crate::store::KeyValueStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_collection_get_put() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();
        let collection = store.collection("rates").unwrap();

        assert!(collection.get("last_nbu_rate.USD").await.is_none());

        collection.put("last_nbu_rate.USD", "39.5".to_string()).await;
        assert_eq!(
            collection.get("last_nbu_rate.USD").await.as_deref(),
            Some("39.5")
        );

        collection.remove("last_nbu_rate.USD").await;
        assert!(collection.get("last_nbu_rate.USD").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_collection_survives_reopen() {
        let dir = tempdir().unwrap();

        {
            let store = KeyValueStore::open(dir.path()).unwrap();
            let collection = store.collection("rates").unwrap();
            collection.put("last_nbu_rate.USD", "39.10".to_string()).await;
        }

        let store = KeyValueStore::open(dir.path()).unwrap();
        let collection = store.collection("rates").unwrap();
        assert_eq!(
            collection.get("last_nbu_rate.USD").await.as_deref(),
            Some("39.10")
        );
    }
}
