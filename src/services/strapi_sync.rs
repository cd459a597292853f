use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::services::lock::SyncLock;
use crate::strapi::{StrapiClient, parse_course};

pub const ADMIN_SYNC_LOCK: &str = "strapi_sync_admin_running";

pub fn frontend_lock_name(document_id: &str) -> String {
    format!("strapi_sync_frontend_{}", document_id)
}

#[derive(Debug, Serialize)]
pub struct StrapiSyncStats {
    pub run_id: Uuid,
    /// Another run held the lock; nothing was fetched.
    pub locked: bool,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl StrapiSyncStats {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            locked: false,
            created: 0,
            updated: 0,
            skipped: 0,
        }
    }
}

pub struct StrapiSyncService {
    db: SqlitePool,
    strapi: Arc<dyn StrapiClient>,
    lock: SyncLock,
}

impl StrapiSyncService {
    pub fn new(db: SqlitePool, strapi: Arc<dyn StrapiClient>, lock: SyncLock) -> Self {
        Self { db, strapi, lock }
    }

    pub async fn sync_all(&self) -> Result<StrapiSyncStats, AppError> {
        self.locked_run(ADMIN_SYNC_LOCK, None).await
    }

    pub async fn sync_one(&self, document_id: &str) -> Result<StrapiSyncStats, AppError> {
        self.locked_run(&frontend_lock_name(document_id), Some(document_id)).await
    }

    async fn locked_run(&self, lock_name: &str, document_id: Option<&str>) -> Result<StrapiSyncStats, AppError> {
        let mut stats = StrapiSyncStats::new();
        if !self.lock.try_acquire(lock_name).await? {
            info!(run_id = %stats.run_id, lock = lock_name, "Strapi sync already running, skipping");
            stats.locked = true;
            return Ok(stats);
        }

        let result = self.run(document_id, &mut stats).await;
        self.lock.release(lock_name).await?;
        result?;

        info!(
            run_id = %stats.run_id,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            "Strapi sync completed"
        );
        Ok(stats)
    }

    async fn run(&self, document_id: Option<&str>, stats: &mut StrapiSyncStats) -> Result<(), AppError> {
        info!(run_id = %stats.run_id, document_id = document_id.unwrap_or("*"), "Starting Strapi sync...");
        let entries = self.strapi.fetch_courses(document_id).await?;

        for entry in &entries {
            let Some(course) = parse_course(entry) else {
                warn!(run_id = %stats.run_id, "skipping Strapi entry without document id or title");
                stats.skipped += 1;
                continue;
            };

            match repository::upsert_strapi_course(&self.db, &course).await {
                Ok(true) => stats.created += 1,
                Ok(false) => stats.updated += 1,
                Err(e) => {
                    warn!(document_id = %course.document_id, "failed to store Strapi course: {}", e);
                    stats.skipped += 1;
                }
            }
        }

        Ok(())
    }
}
