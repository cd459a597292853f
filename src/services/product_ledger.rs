//! Keeps exactly one standard and one live product per source course.

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::config::OrphanPolicy;
use crate::db::{FieldStore, MetaStore, Scope, repository};
use crate::error::SyncError;
use crate::fields::MetaKey;
use crate::models::{ProductKind, STATUS_TRASH};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerOutcome {
    pub standard: Option<i64>,
    pub live: Option<i64>,
}

pub struct ProductLedger {
    db: SqlitePool,
    meta: Arc<dyn MetaStore>,
    fields: FieldStore,
    orphan_policy: OrphanPolicy,
    site_url: String,
}

impl ProductLedger {
    pub fn new(
        db: SqlitePool,
        meta: Arc<dyn MetaStore>,
        fields: FieldStore,
        orphan_policy: OrphanPolicy,
        site_url: String,
    ) -> Self {
        Self {
            db,
            meta,
            fields,
            orphan_policy,
            site_url,
        }
    }

    /// Creates or updates both product kinds. A failure on one kind is logged
    /// and leaves the other kind untouched.
    pub async fn sync(&self, source_id: i64, page_id: i64, title: &str, price: &str) -> LedgerOutcome {
        let mut outcome = LedgerOutcome::default();

        for kind in ProductKind::ALL {
            match self.sync_kind(kind, source_id, page_id, title, price).await {
                Ok(product_id) => match kind {
                    ProductKind::Standard => outcome.standard = Some(product_id),
                    ProductKind::Live => outcome.live = Some(product_id),
                },
                Err(e) => warn!(source_id, ?kind, "failed to sync product: {}", e),
            }
        }

        outcome
    }

    async fn sync_kind(
        &self,
        kind: ProductKind,
        source_id: i64,
        page_id: i64,
        title: &str,
        price: &str,
    ) -> Result<i64, SyncError> {
        let product_title = kind.title_for(title);
        let stored_id = self
            .meta
            .get_id(Scope::SourceCourse(source_id), kind.meta_key())
            .await?;

        let live_product = match stored_id {
            Some(id) => repository::find_product(&self.db, id)
                .await?
                .filter(|p| p.is_published()),
            None => None,
        };

        let product_id = match live_product {
            Some(product) => {
                if !repository::update_product(&self.db, product.id, &product_title, price).await? {
                    return Err(SyncError::WriteFailed(format!("product {} vanished during update", product.id)));
                }
                debug!(source_id, product_id = product.id, ?kind, "updated product");
                product.id
            }
            None => {
                let product_id = repository::insert_product(&self.db, &product_title, price).await?;
                info!(source_id, product_id, ?kind, "created product");
                if let Some(stale_id) = stored_id {
                    self.retire(stale_id).await?;
                }
                self.meta
                    .set_id(Scope::SourceCourse(source_id), kind.meta_key(), product_id)
                    .await?;
                product_id
            }
        };

        self.meta
            .set_id(Scope::Product(product_id), MetaKey::RelatedSourceCourseId, source_id)
            .await?;
        self.fields
            .update(page_id, kind.link_field(), &self.add_to_cart_link(product_id))
            .await?;

        Ok(product_id)
    }

    async fn retire(&self, stale_id: i64) -> Result<(), SyncError> {
        match self.orphan_policy {
            OrphanPolicy::Keep => {
                debug!(product_id = stale_id, "keeping replaced product");
            }
            OrphanPolicy::Trash => {
                if let Some(product) = repository::find_product(&self.db, stale_id).await? {
                    if product.status != STATUS_TRASH {
                        repository::set_product_status(&self.db, stale_id, STATUS_TRASH).await?;
                        info!(product_id = stale_id, "trashed replaced product");
                    }
                }
            }
        }
        Ok(())
    }

    fn add_to_cart_link(&self, product_id: i64) -> String {
        format!("{}/?add-to-cart={}&quantity=1", self.site_url, product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteMetaStore;
    use crate::fields::PageField;
    use crate::models::STATUS_DRAFT;
    use crate::test_utils::setup_test_db;

    async fn ledger(pool: &SqlitePool, policy: OrphanPolicy) -> (ProductLedger, Arc<dyn MetaStore>, i64) {
        let meta: Arc<dyn MetaStore> = Arc::new(SqliteMetaStore::new(pool.clone()));
        let page_id = repository::insert_page(pool, "Intro to Rust", "intro-to-rust", None)
            .await
            .unwrap();
        let ledger = ProductLedger::new(
            pool.clone(),
            meta.clone(),
            FieldStore::new(pool.clone()),
            policy,
            "https://academy.test".to_string(),
        );
        (ledger, meta, page_id)
    }

    #[tokio::test]
    async fn test_repeated_syncs_converge_on_two_products() {
        let pool = setup_test_db().await;
        let (ledger, _, page_id) = ledger(&pool, OrphanPolicy::Keep).await;

        let first = ledger.sync(1, page_id, "Intro to Rust", "49").await;
        ledger.sync(1, page_id, "Intro to Rust", "59").await;
        let last = ledger.sync(1, page_id, "Intro to Rust", "69.5").await;

        assert_eq!(first, last);
        assert_eq!(repository::count_products(&pool).await.unwrap(), 2);

        let standard = repository::find_product(&pool, last.standard.unwrap()).await.unwrap().unwrap();
        let live = repository::find_product(&pool, last.live.unwrap()).await.unwrap().unwrap();
        assert_eq!(standard.title, "Intro to Rust");
        assert_eq!(live.title, "Webinar - Intro to Rust");
        assert_eq!(standard.price, "69.5");
        assert_eq!(live.regular_price, "69.5");
    }

    #[tokio::test]
    async fn test_links_and_back_references_are_written() {
        let pool = setup_test_db().await;
        let (ledger, meta, page_id) = ledger(&pool, OrphanPolicy::Keep).await;

        let outcome = ledger.sync(4, page_id, "Intro to Rust", "49").await;
        let standard = outcome.standard.unwrap();

        let fields = FieldStore::new(pool.clone());
        assert_eq!(
            fields.get(page_id, PageField::CourseProductLink).await.unwrap().unwrap(),
            format!("https://academy.test/?add-to-cart={}&quantity=1", standard)
        );
        assert_eq!(
            meta.get_id(Scope::Product(standard), MetaKey::RelatedSourceCourseId).await.unwrap(),
            Some(4)
        );
        assert_eq!(
            meta.get_id(Scope::SourceCourse(4), MetaKey::LiveProductId).await.unwrap(),
            outcome.live
        );
    }

    #[tokio::test]
    async fn test_unpublished_product_is_replaced_and_trashed() {
        let pool = setup_test_db().await;
        let (ledger, meta, page_id) = ledger(&pool, OrphanPolicy::Trash).await;

        let first = ledger.sync(1, page_id, "Intro", "49").await;
        let old_standard = first.standard.unwrap();
        repository::set_product_status(&pool, old_standard, STATUS_DRAFT).await.unwrap();

        let second = ledger.sync(1, page_id, "Intro", "49").await;
        let new_standard = second.standard.unwrap();

        assert_ne!(old_standard, new_standard);
        assert_eq!(second.live, first.live);
        assert_eq!(
            meta.get_id(Scope::SourceCourse(1), MetaKey::StandardProductId).await.unwrap(),
            Some(new_standard)
        );
        let old = repository::find_product(&pool, old_standard).await.unwrap().unwrap();
        assert_eq!(old.status, STATUS_TRASH);
    }

    #[tokio::test]
    async fn test_dangling_stored_id_is_replaced_with_keep_policy() {
        let pool = setup_test_db().await;
        let (ledger, meta, page_id) = ledger(&pool, OrphanPolicy::Keep).await;
        meta.set_id(Scope::SourceCourse(1), MetaKey::StandardProductId, 999).await.unwrap();

        let outcome = ledger.sync(1, page_id, "Intro", "49").await;

        assert_ne!(outcome.standard, Some(999));
        assert_eq!(repository::count_products(&pool).await.unwrap(), 2);
    }
}
