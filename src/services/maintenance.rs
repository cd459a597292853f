//! One-off migration that collapses array-valued category fields on
//! existing course pages to their first entry.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::{FieldStore, MetaStore, Scope, repository};
use crate::fields::{MetaKey, PageField};
use crate::notices::AdminNotices;
use crate::sanitize::sanitize_text_field;

pub const CATEGORY_BATCH_SIZE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NormalizeProgress {
    AlreadyDone,
    Batch { offset: i64, processed: usize, updated: usize },
    Finished,
}

pub struct CategoryNormalizer {
    db: SqlitePool,
    meta: Arc<dyn MetaStore>,
    fields: FieldStore,
    notices: AdminNotices,
}

impl CategoryNormalizer {
    pub fn new(db: SqlitePool, meta: Arc<dyn MetaStore>, fields: FieldStore, notices: AdminNotices) -> Self {
        Self {
            db,
            meta,
            fields,
            notices,
        }
    }

    pub async fn run_batch(&self) -> Result<NormalizeProgress, sqlx::Error> {
        if self.meta.get_key(Scope::Site, MetaKey::CategoriesUpdated).await?.is_some() {
            debug!("category normalization already completed");
            return Ok(NormalizeProgress::AlreadyDone);
        }

        let offset = self
            .meta
            .get_key(Scope::Site, MetaKey::CategoriesUpdateOffset)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let page_ids = repository::list_published_page_ids(&self.db, offset, CATEGORY_BATCH_SIZE).await?;

        if page_ids.is_empty() {
            self.meta.set_key(Scope::Site, MetaKey::CategoriesUpdated, "1").await?;
            self.meta
                .delete(Scope::Site, MetaKey::CategoriesUpdateOffset.as_str())
                .await?;
            self.notices
                .success("Course Management: Course categories have been successfully updated to use single strings.");
            info!("category normalization finished");
            return Ok(NormalizeProgress::Finished);
        }

        let mut updated = 0;
        for &page_id in &page_ids {
            let Some(raw) = self.fields.get(page_id, PageField::Categories).await? else {
                continue;
            };
            let Some(first) = first_category(&raw) else {
                continue;
            };
            match self.fields.update(page_id, PageField::Categories, &first).await {
                Ok(()) => {
                    debug!(page_id, category = %first, "normalized categories");
                    updated += 1;
                }
                Err(e) => warn!(page_id, "failed to normalize categories: {}", e),
            }
        }

        let next = offset + CATEGORY_BATCH_SIZE;
        self.meta
            .set_key(Scope::Site, MetaKey::CategoriesUpdateOffset, &next.to_string())
            .await?;
        info!(offset = next, processed = page_ids.len(), updated, "category batch processed");

        Ok(NormalizeProgress::Batch {
            offset: next,
            processed: page_ids.len(),
            updated,
        })
    }
}

/// First entry of a JSON array value, or `None` for plain strings.
fn first_category(raw: &str) -> Option<String> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => match items.first()? {
            Value::String(s) => Some(sanitize_text_field(s)),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteMetaStore;
    use crate::notices::NoticeLevel;
    use crate::test_utils::setup_test_db;

    #[test]
    fn test_first_category_only_touches_arrays() {
        assert_eq!(first_category(r#"["AI","Data"]"#).as_deref(), Some("AI"));
        assert_eq!(first_category("[]"), None);
        assert_eq!(first_category("AI"), None);
        assert_eq!(first_category(r#""AI""#), None);
    }

    #[tokio::test]
    async fn test_normalizes_in_batches_then_finishes_once() {
        let pool = setup_test_db().await;
        let meta: Arc<dyn MetaStore> = Arc::new(SqliteMetaStore::new(pool.clone()));
        let fields = FieldStore::new(pool.clone());
        let notices = AdminNotices::new();

        let mut pages = Vec::new();
        for n in 0..12 {
            let id = repository::insert_page(&pool, &format!("Page {}", n), &format!("page-{}", n), None)
                .await
                .unwrap();
            fields.update(id, PageField::Categories, r#"["AI","Data"]"#).await.unwrap();
            pages.push(id);
        }
        fields.update(pages[0], PageField::Categories, "Design").await.unwrap();

        let normalizer = CategoryNormalizer::new(pool.clone(), meta.clone(), fields.clone(), notices.clone());

        assert_eq!(
            normalizer.run_batch().await.unwrap(),
            NormalizeProgress::Batch { offset: 10, processed: 10, updated: 9 }
        );
        assert_eq!(
            normalizer.run_batch().await.unwrap(),
            NormalizeProgress::Batch { offset: 20, processed: 2, updated: 2 }
        );
        assert_eq!(normalizer.run_batch().await.unwrap(), NormalizeProgress::Finished);
        assert_eq!(normalizer.run_batch().await.unwrap(), NormalizeProgress::AlreadyDone);

        assert_eq!(fields.get(pages[0], PageField::Categories).await.unwrap().as_deref(), Some("Design"));
        assert_eq!(fields.get(pages[11], PageField::Categories).await.unwrap().as_deref(), Some("AI"));
        assert!(meta.get_key(Scope::Site, MetaKey::CategoriesUpdateOffset).await.unwrap().is_none());

        let drained = notices.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].level, NoticeLevel::Success);
    }
}
