//! PostgreSQL-backed documents (JSONB), one row per path.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{DocumentStore, StoreError};

#[derive(Clone)]
pub struct PgDocumentStore { db: PgPool }

impl PgDocumentStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
        sqlx::migrate!("./migrations").run(&db).await.map_err(sqlx::Error::from)?;
        Ok(Self { db })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT data FROM documents WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn merge(&self, path: &str, patch: Value) -> Result<(), StoreError> {
        if !patch.is_object() { return Err(StoreError::NotAnObject(path.to_string())); }
        sqlx::query("INSERT INTO documents (path, data, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (path) DO UPDATE SET data = documents.data || EXCLUDED.data, updated_at = NOW()")
            .bind(path)
            .bind(&patch)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
