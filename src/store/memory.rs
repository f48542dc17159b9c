use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{merge_into, DocumentStore, StoreError};

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryStore { docs: RwLock<HashMap<String, Value>> }

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert(&self, path: impl Into<String>, doc: Value) { self.docs.write().await.insert(path.into(), doc); }
    pub async fn len(&self) -> usize { self.docs.read().await.len() }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> { Ok(self.docs.read().await.get(path).cloned()) }

    async fn merge(&self, path: &str, patch: Value) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let doc = docs.entry(path.to_string()).or_insert(Value::Null);
        merge_into(doc, path, patch)
    }
}
