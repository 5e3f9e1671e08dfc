//! Local durable key/value storage abstraction

use async_trait::async_trait;

/// String key/value collection. Implementations swallow and trace their own
/// I/O failures: a storage problem must never abort a reconciliation.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: String);
    async fn remove(&self, key: &str);
}
