use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::fields::PageField;

/// Structured field storage for course pages.
#[derive(Clone)]
pub struct FieldStore {
    db: SqlitePool,
}

impl FieldStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get(&self, page_id: i64, field: PageField) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM page_fields WHERE page_id = ? AND field_key = ?",
        )
        .bind(page_id)
        .bind(field.key())
        .fetch_optional(&self.db)
        .await
    }

    pub async fn update(&self, page_id: i64, field: PageField, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO page_fields (page_id, field_key, value)
            VALUES (?, ?, ?)
            ON CONFLICT (page_id, field_key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(page_id)
        .bind(field.key())
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// All known fields of a page keyed by logical name.
    pub async fn all_for_page(&self, page_id: i64) -> Result<BTreeMap<String, String>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT field_key, value FROM page_fields WHERE page_id = ?",
        )
        .bind(page_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, value)| PageField::from_key(&key).map(|f| (f.name().to_string(), value)))
            .collect())
    }
}
