//! Grants course access to the buyer when an order completes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::db::{MetaStore, Scope, repository};
use crate::models::ProductKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    OrderNotFound,
    NoUser,
    NoMappings,
    NoItems,
    StorageError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentReport {
    pub order_id: i64,
    pub enrolled: Vec<i64>,
    pub already_enrolled: Vec<i64>,
    pub failed: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortReason>,
}

pub struct EnrollmentService {
    db: SqlitePool,
    meta: Arc<dyn MetaStore>,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool, meta: Arc<dyn MetaStore>) -> Self {
        Self { db, meta }
    }

    /// Never fails outward; everything that goes wrong ends up in the report.
    pub async fn on_order_completed(&self, order_id: i64) -> EnrollmentReport {
        let mut report = EnrollmentReport {
            order_id,
            ..Default::default()
        };
        info!(order_id, "processing completed order");

        if let Err(e) = self.enroll(order_id, &mut report).await {
            error!(order_id, "enrollment aborted by storage error: {}", e);
            report.aborted = Some(AbortReason::StorageError);
        }

        info!(
            order_id,
            enrolled = report.enrolled.len(),
            already_enrolled = report.already_enrolled.len(),
            failed = report.failed.len(),
            "order processed"
        );
        report
    }

    async fn enroll(&self, order_id: i64, report: &mut EnrollmentReport) -> Result<(), sqlx::Error> {
        let Some(order) = repository::find_order(&self.db, order_id).await? else {
            warn!(order_id, "order not found");
            report.aborted = Some(AbortReason::OrderNotFound);
            return Ok(());
        };
        let Some(user_id) = order.user_id.filter(|id| *id > 0) else {
            warn!(order_id, "order has no user");
            report.aborted = Some(AbortReason::NoUser);
            return Ok(());
        };

        let mapping = self.product_course_map().await?;
        if mapping.is_empty() {
            warn!(order_id, "no product to course mappings available");
            report.aborted = Some(AbortReason::NoMappings);
            return Ok(());
        }

        let items = repository::fetch_order_items(&self.db, order_id).await?;
        if items.is_empty() {
            warn!(order_id, "order has no items");
            report.aborted = Some(AbortReason::NoItems);
            return Ok(());
        }

        for item in items {
            let Some(course_ids) = mapping.get(&item.product_id) else {
                debug!(order_id, product_id = item.product_id, "product is not linked to a course");
                continue;
            };

            for &course_id in course_ids {
                if let Err(e) = self.enroll_course(user_id, course_id, report).await {
                    error!(user_id, course_id, "failed to enroll user: {}", e);
                    report.failed.push(course_id);
                }
            }
        }

        Ok(())
    }

    /// Storage errors stay scoped to this course; the caller moves on.
    async fn enroll_course(&self, user_id: i64, course_id: i64, report: &mut EnrollmentReport) -> Result<(), sqlx::Error> {
        match repository::find_source_course(&self.db, course_id).await? {
            Some(course) if course.is_published() => {}
            _ => {
                warn!(course_id, "mapped course is missing or unpublished");
                report.failed.push(course_id);
                return Ok(());
            }
        }

        if repository::enrollment_exists(&self.db, user_id, course_id).await? {
            debug!(user_id, course_id, "already enrolled");
            report.already_enrolled.push(course_id);
            return Ok(());
        }

        repository::insert_enrollment(&self.db, user_id, course_id).await?;
        info!(user_id, course_id, "enrolled user");
        report.enrolled.push(course_id);
        Ok(())
    }

    /// Product id -> source courses, from the stored ids of every published
    /// source course. Only published products are mapped.
    pub async fn product_course_map(&self) -> Result<HashMap<i64, Vec<i64>>, sqlx::Error> {
        let mut mapping: HashMap<i64, Vec<i64>> = HashMap::new();

        for course_id in repository::all_published_source_course_ids(&self.db).await? {
            for kind in ProductKind::ALL {
                let Some(product_id) = self.meta.get_id(Scope::SourceCourse(course_id), kind.meta_key()).await? else {
                    continue;
                };
                match repository::find_product(&self.db, product_id).await? {
                    Some(product) if product.is_published() => {
                        mapping.entry(product_id).or_default().push(course_id);
                    }
                    _ => debug!(course_id, product_id, "linked product is missing or unpublished"),
                }
            }
        }

        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteMetaStore;
    use crate::models::STATUS_DRAFT;
    use crate::test_utils::{insert_order, insert_source_course, insert_user, setup_test_db};

    /// One published course with both products linked.
    async fn seeded() -> (SqlitePool, EnrollmentService, i64, i64) {
        let pool = setup_test_db().await;
        let meta: Arc<dyn MetaStore> = Arc::new(SqliteMetaStore::new(pool.clone()));
        insert_source_course(&pool, 1, "Intro", "publish").await;
        insert_user(&pool, 7, "Buyer", false).await;

        let standard = repository::insert_product(&pool, "Intro", "49").await.unwrap();
        let live = repository::insert_product(&pool, "Webinar - Intro", "49").await.unwrap();
        meta.set_id(Scope::SourceCourse(1), ProductKind::Standard.meta_key(), standard).await.unwrap();
        meta.set_id(Scope::SourceCourse(1), ProductKind::Live.meta_key(), live).await.unwrap();

        (pool.clone(), EnrollmentService::new(pool, meta), standard, live)
    }

    #[tokio::test]
    async fn test_enrolls_once_per_user_and_course() {
        let (pool, service, standard, live) = seeded().await;
        insert_order(&pool, 100, Some(7), &[standard]).await;
        insert_order(&pool, 101, Some(7), &[standard, live]).await;

        let first = service.on_order_completed(100).await;
        assert_eq!(first.enrolled, vec![1]);

        let second = service.on_order_completed(101).await;
        assert!(second.enrolled.is_empty());
        assert_eq!(second.already_enrolled, vec![1, 1]);

        let enrollments = repository::fetch_enrollments_for_user(&pool, 7).await.unwrap();
        assert_eq!(enrollments.len(), 1);
        assert_eq!(enrollments[0].progress_percent, 0);
        assert_eq!(enrollments[0].status, "enrolled");
    }

    #[tokio::test]
    async fn test_unpublished_products_are_not_mapped() {
        let (pool, service, standard, live) = seeded().await;
        repository::set_product_status(&pool, live, STATUS_DRAFT).await.unwrap();

        let mapping = service.product_course_map().await.unwrap();
        assert_eq!(mapping.get(&standard), Some(&vec![1]));
        assert!(!mapping.contains_key(&live));

        insert_order(&pool, 100, Some(7), &[live]).await;
        let report = service.on_order_completed(100).await;
        assert!(report.enrolled.is_empty());
        assert!(report.aborted.is_none());
    }

    #[tokio::test]
    async fn test_aborts_are_reported() {
        let (pool, service, standard, _) = seeded().await;
        insert_order(&pool, 100, None, &[standard]).await;
        insert_order(&pool, 101, Some(7), &[]).await;

        assert_eq!(service.on_order_completed(999).await.aborted, Some(AbortReason::OrderNotFound));
        assert_eq!(service.on_order_completed(100).await.aborted, Some(AbortReason::NoUser));
        assert_eq!(service.on_order_completed(101).await.aborted, Some(AbortReason::NoItems));
    }

    #[tokio::test]
    async fn test_storage_error_on_one_course_does_not_stop_the_order() {
        let (pool, service, standard, _) = seeded().await;
        insert_source_course(&pool, 2, "Advanced", "publish").await;
        let advanced = repository::insert_product(&pool, "Advanced", "99").await.unwrap();
        SqliteMetaStore::new(pool.clone())
            .set_id(Scope::SourceCourse(2), ProductKind::Standard.meta_key(), advanced)
            .await
            .unwrap();
        insert_order(&pool, 100, Some(7), &[standard, advanced]).await;

        sqlx::query("DROP TABLE enrollments").execute(&pool).await.unwrap();

        let report = service.on_order_completed(100).await;
        assert_eq!(report.aborted, None);
        assert!(report.enrolled.is_empty());
        assert_eq!(report.failed, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_mapping_aborts() {
        let pool = setup_test_db().await;
        let meta: Arc<dyn MetaStore> = Arc::new(SqliteMetaStore::new(pool.clone()));
        insert_order(&pool, 100, Some(7), &[1]).await;

        let report = EnrollmentService::new(pool, meta).on_order_completed(100).await;
        assert_eq!(report.aborted, Some(AbortReason::NoMappings));
    }
}
