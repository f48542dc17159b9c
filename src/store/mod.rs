//! Document persistence.
//!
//! Documents are JSON objects addressed by slash paths such as
//! `orders/{id}` or `users/{uid}/orders/{id}`. Writes are merges: top-level
//! keys in the patch replace those in the stored document, others are kept.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("patch for {0} is not a JSON object")]
    NotAnObject(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;
    /// Create the document if missing, otherwise merge top-level keys.
    async fn merge(&self, path: &str, patch: Value) -> Result<(), StoreError>;
}

pub fn order_path(order_id: &str) -> String { format!("orders/{order_id}") }
pub fn user_order_path(uid: &str, order_id: &str) -> String { format!("users/{uid}/orders/{order_id}") }
pub fn refund_path(request_id: &str) -> String { format!("refundRequests/{request_id}") }
pub fn user_refund_path(uid: &str, request_id: &str) -> String { format!("users/{uid}/refundRequests/{request_id}") }

/// Shallow merge of `patch` into `doc`.
pub(crate) fn merge_into(doc: &mut Value, path: &str, patch: Value) -> Result<(), StoreError> {
    let Value::Object(patch) = patch else { return Err(StoreError::NotAnObject(path.to_string())) };
    if !doc.is_object() { *doc = Value::Object(Default::default()); }
    if let Value::Object(target) = doc {
        target.extend(patch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_into() {
        let mut doc = json!({"a": 1, "b": {"x": 1}});
        merge_into(&mut doc, "p", json!({"b": {"y": 2}, "c": null})).unwrap();
        assert_eq!(doc, json!({"a": 1, "b": {"y": 2}, "c": null}));
        assert!(merge_into(&mut doc, "p", json!([1])).is_err());
    }

    #[test]
    fn test_paths() {
        assert_eq!(user_order_path("u1", "o1"), "users/u1/orders/o1");
        assert_eq!(refund_path("r1"), "refundRequests/r1");
    }
}
