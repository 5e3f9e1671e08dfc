use crate::core::cache::KeyValueCollection;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection, lost when the process exits
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &str) -> Option<String> {
        let value = self.inner.lock().await.get(key).cloned();
        if value.is_some() {
            debug!("Cache HIT for key: {}", key);
        } else {
            debug!("Cache MISS for key: {}", key);
        }
        value
    }

    async fn put(&self, key: &str, value: String) {
        self.inner.lock().await.insert(key.to_string(), value);
        debug!("Cache PUT for key: {}", key);
    }

    async fn remove(&self, key: &str) {
        self.inner.lock().await.remove(key);
        debug!("Cache REMOVE for key: {}", key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_collection_get_put() {
        let collection = MemoryCollection::new();

        // Initially, collection is empty
        assert!(collection.get("last_nbu_rate.USD").await.is_none());

        collection.put("last_nbu_rate.USD", "39.5".to_string()).await;
        assert_eq!(
            collection.get("last_nbu_rate.USD").await.as_deref(),
            Some("39.5")
        );

        // Overwrites the previous value
        collection.put("last_nbu_rate.USD", "41.2".to_string()).await;
        assert_eq!(
            collection.get("last_nbu_rate.USD").await.as_deref(),
            Some("41.2")
        );

        assert!(collection.get("last_nbu_rate.EUR").await.is_none());
    }

    #[tokio::test]
    async fn test_memory_collection_remove() {
        let collection = MemoryCollection::new();

        collection.put("key1", "1".to_string()).await;
        collection.remove("key1").await;
        assert!(collection.get("key1").await.is_none());
    }
}
