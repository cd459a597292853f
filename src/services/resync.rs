use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{MetaStore, Scope};
use crate::error::SyncError;
use crate::fields::MetaKey;
use crate::services::fetcher::CourseFetcher;
use crate::services::page_upsert::{PageUpsert, UpsertOutcome};

pub const UPDATE_REQUESTED: &str = "update";
pub const NO_UPDATE: &str = "no_update";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ResyncOutcome {
    /// The source course was saved without asking for a resync.
    Skipped,
    NoData,
    Synced(UpsertOutcome),
}

/// Resyncs a single course page when its source course is saved with the
/// update flag set. The flag is cleared after every attempt.
pub struct ResyncService {
    meta: Arc<dyn MetaStore>,
    fetcher: CourseFetcher,
    upsert: PageUpsert,
}

impl ResyncService {
    pub fn new(meta: Arc<dyn MetaStore>, fetcher: CourseFetcher, upsert: PageUpsert) -> Self {
        Self { meta, fetcher, upsert }
    }

    pub async fn request(&self, course_id: i64, flag: &str) -> Result<(), SyncError> {
        self.meta
            .set_key(Scope::SourceCourse(course_id), MetaKey::UpdateCoursePage, flag)
            .await?;
        Ok(())
    }

    pub async fn on_save(&self, course_id: i64) -> Result<ResyncOutcome, SyncError> {
        let flag = self
            .meta
            .get_key(Scope::SourceCourse(course_id), MetaKey::UpdateCoursePage)
            .await?;
        debug!(course_id, flag = flag.as_deref().unwrap_or("none"), "source course saved");
        if flag.as_deref() != Some(UPDATE_REQUESTED) {
            return Ok(ResyncOutcome::Skipped);
        }

        let result = match self.fetcher.fetch(course_id).await {
            Some(record) => self.upsert.upsert(course_id, &record).await.map(ResyncOutcome::Synced),
            None => {
                warn!(course_id, "no course data returned, page left as is");
                Ok(ResyncOutcome::NoData)
            }
        };

        self.meta
            .set_key(Scope::SourceCourse(course_id), MetaKey::UpdateCoursePage, NO_UPDATE)
            .await?;
        info!(course_id, "resync flag cleared");
        result
    }
}
