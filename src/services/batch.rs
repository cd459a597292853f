//! Drives fetch + page upsert over every published source course, one page
//! of `batch_size` courses per request.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::{self, AuthUser, NonceIssuer, CREATE_PAGES_ACTION};
use crate::db::repository;
use crate::error::AppError;
use crate::services::fetcher::CourseFetcher;
use crate::services::page_upsert::PageUpsert;

pub const PAGES_CREATED_REDIRECT: &str = "/admin/course-pages?message=pages_created";

/// One batch call as received from the admin screen.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub user: Option<AuthUser>,
    pub nonce: Option<String>,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub successful_creations: u32,
    pub failed_creations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BatchProgress {
    fn finished(message: &str) -> Self {
        Self {
            complete: true,
            redirect: Some(PAGES_CREATED_REDIRECT.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }
}

pub struct BatchOrchestrator {
    db: SqlitePool,
    fetcher: CourseFetcher,
    upsert: PageUpsert,
    nonces: NonceIssuer,
    batch_size: i64,
}

impl BatchOrchestrator {
    pub fn new(
        db: SqlitePool,
        fetcher: CourseFetcher,
        upsert: PageUpsert,
        nonces: NonceIssuer,
        batch_size: u32,
    ) -> Self {
        Self {
            db,
            fetcher,
            upsert,
            nonces,
            batch_size: i64::from(batch_size.max(1)),
        }
    }

    /// Rejects the request before any course is touched unless the nonce is
    /// valid and the caller is an administrator.
    pub async fn handle(&self, request: BatchRequest) -> Result<BatchProgress, AppError> {
        let user = auth::authorize_ajax(
            &self.nonces,
            CREATE_PAGES_ACTION,
            request.user.as_ref(),
            request.nonce.as_deref(),
        )?;
        info!(user_id = user.user_id, offset = request.offset, "course page batch requested");
        Ok(self.run_page(request.offset.max(0)).await?)
    }

    pub async fn run_page(&self, offset: i64) -> Result<BatchProgress, sqlx::Error> {
        let total = repository::count_published_source_courses(&self.db).await?;
        if total == 0 {
            info!("no published source courses to process");
            return Ok(BatchProgress::finished("No published courses found"));
        }

        let ids = repository::list_published_source_course_ids(&self.db, offset, self.batch_size).await?;
        if ids.is_empty() {
            info!(total, "course page batch complete");
            return Ok(BatchProgress::finished("All course pages processed"));
        }

        let mut successful = 0;
        let mut failed = 0;
        for &course_id in &ids {
            let Some(record) = self.fetcher.fetch(course_id).await else {
                warn!(course_id, "no course data, skipping");
                failed += 1;
                continue;
            };

            match self.upsert.upsert(course_id, &record).await {
                Ok(_) => successful += 1,
                Err(e) => {
                    warn!(course_id, "course page sync failed: {}", e);
                    failed += 1;
                }
            }
        }

        let processed = offset + ids.len() as i64;
        let progress = ((processed as f64 / total as f64) * 100.0).round().min(100.0) as u32;
        info!(offset, processed, total, successful, failed, "course page batch processed");

        Ok(BatchProgress {
            complete: false,
            offset: Some(offset + self.batch_size),
            progress: Some(progress),
            redirect: None,
            successful_creations: successful,
            failed_creations: failed,
            message: None,
        })
    }
}
