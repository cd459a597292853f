//! Scalar metadata keyed by entity. Back-references between source courses,
//! pages and products, site options and sync locks all live here.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::fields::MetaKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    SourceCourse(i64),
    Page(i64),
    Product(i64),
    Site,
}

impl Scope {
    fn parts(self) -> (&'static str, i64) {
        match self {
            Scope::SourceCourse(id) => ("source_course", id),
            Scope::Page(id) => ("page", id),
            Scope::Product(id) => ("product", id),
            Scope::Site => ("site", 0),
        }
    }
}

#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, sqlx::Error>;
    async fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), sqlx::Error>;
    async fn delete(&self, scope: Scope, key: &str) -> Result<(), sqlx::Error>;

    async fn get_key(&self, scope: Scope, key: MetaKey) -> Result<Option<String>, sqlx::Error> {
        self.get(scope, key.as_str()).await
    }

    async fn set_key(&self, scope: Scope, key: MetaKey, value: &str) -> Result<(), sqlx::Error> {
        self.set(scope, key.as_str(), value).await
    }

    /// Stored ids are only honoured when they parse as positive integers.
    async fn get_id(&self, scope: Scope, key: MetaKey) -> Result<Option<i64>, sqlx::Error> {
        Ok(self
            .get(scope, key.as_str())
            .await?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0))
    }

    async fn set_id(&self, scope: Scope, key: MetaKey, id: i64) -> Result<(), sqlx::Error> {
        self.set(scope, key.as_str(), &id.to_string()).await
    }
}

pub struct SqliteMetaStore {
    db: SqlitePool,
}

impl SqliteMetaStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetaStore for SqliteMetaStore {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, sqlx::Error> {
        let (kind, entity_id) = scope.parts();
        sqlx::query_scalar::<_, String>(
            "SELECT meta_value FROM meta WHERE scope = ? AND entity_id = ? AND meta_key = ?",
        )
        .bind(kind)
        .bind(entity_id)
        .bind(key)
        .fetch_optional(&self.db)
        .await
    }

    async fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), sqlx::Error> {
        let (kind, entity_id) = scope.parts();
        sqlx::query(
            r#"
            INSERT INTO meta (scope, entity_id, meta_key, meta_value)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (scope, entity_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value
            "#,
        )
        .bind(kind)
        .bind(entity_id)
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, scope: Scope, key: &str) -> Result<(), sqlx::Error> {
        let (kind, entity_id) = scope.parts();
        sqlx::query("DELETE FROM meta WHERE scope = ? AND entity_id = ? AND meta_key = ?")
            .bind(kind)
            .bind(entity_id)
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Process-local store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryMetaStore {
    values: RwLock<HashMap<(Scope, String), String>>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, sqlx::Error> {
        Ok(self.values.read().await.get(&(scope, key.to_string())).cloned())
    }

    async fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), sqlx::Error> {
        self.values
            .write()
            .await
            .insert((scope, key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete(&self, scope: Scope, key: &str) -> Result<(), sqlx::Error> {
        self.values.write().await.remove(&(scope, key.to_string()));
        Ok(())
    }
}
