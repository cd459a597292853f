//! Creates or updates the presentation page for a source course and writes
//! its structured fields.

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::db::{FieldStore, MetaStore, Scope, repository};
use crate::error::SyncError;
use crate::fields::{MetaKey, PageField};
use crate::models::{CourseRecord, SourceCourse, UNKNOWN_INSTRUCTOR};
use crate::notices::AdminNotices;
use crate::sanitize::{clean_title, is_valid_url, sanitize_title, slug_from_permalink};
use crate::services::product_ledger::{LedgerOutcome, ProductLedger};

#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
    pub page_id: i64,
    pub created: bool,
    pub products: Option<LedgerOutcome>,
}

pub struct PageUpsert {
    db: SqlitePool,
    meta: Arc<dyn MetaStore>,
    /// `None` when structured-field storage is unavailable.
    fields: Option<FieldStore>,
    /// `None` when the commerce subsystem is disabled.
    ledger: Option<ProductLedger>,
    default_image_id: i64,
    notices: AdminNotices,
}

impl PageUpsert {
    pub fn new(
        db: SqlitePool,
        meta: Arc<dyn MetaStore>,
        fields: Option<FieldStore>,
        ledger: Option<ProductLedger>,
        default_image_id: i64,
        notices: AdminNotices,
    ) -> Self {
        Self {
            db,
            meta,
            fields,
            ledger,
            default_image_id,
            notices,
        }
    }

    pub async fn upsert(&self, source_id: i64, record: &CourseRecord) -> Result<UpsertOutcome, SyncError> {
        debug!(source_id, "upserting course page");

        let title = page_title(source_id, &record.title);
        let slug = match slug_from_permalink(&record.permalink) {
            s if s.is_empty() => sanitize_title(&title),
            s => s,
        };
        let source = repository::find_source_course(&self.db, source_id).await?;

        let existing = self
            .meta
            .get_id(Scope::SourceCourse(source_id), MetaKey::RelatedPageId)
            .await?;

        let (page_id, created) = match existing {
            Some(page_id) => {
                if !repository::update_page(&self.db, page_id, &title, &slug).await? {
                    error!(source_id, page_id, "linked course page no longer exists");
                    self.notices.error(format!(
                        "Course Management: course page {} linked from course {} no longer exists. Remove the link to let the page be recreated.",
                        page_id, source_id
                    ));
                    return Err(SyncError::WriteFailed(format!(
                        "course page {} linked from source course {} does not exist",
                        page_id, source_id
                    )));
                }
                debug!(source_id, page_id, "updated course page");
                (page_id, false)
            }
            None => {
                let author_id = source.as_ref().and_then(|s| s.author_id);
                let page_id = repository::insert_page(&self.db, &title, &slug, author_id).await?;
                self.meta
                    .set_id(Scope::SourceCourse(source_id), MetaKey::RelatedPageId, page_id)
                    .await?;
                self.meta
                    .set_id(Scope::Page(page_id), MetaKey::RelatedSourceCourseId, source_id)
                    .await?;
                info!(source_id, page_id, "created course page");
                (page_id, true)
            }
        };

        let Some(fields) = &self.fields else {
            error!(source_id, page_id, "structured field storage is not available");
            self.notices.error(
                "Course Management Error: structured field storage is required but not available.",
            );
            return Err(SyncError::MissingDependency("structured field storage"));
        };

        let thumbnail_id = source_thumbnail(source.as_ref()).unwrap_or(self.default_image_id);
        repository::set_page_thumbnail(&self.db, page_id, thumbnail_id).await?;

        let products = match &self.ledger {
            Some(ledger) => Some(ledger.sync(source_id, page_id, &title, &record.price_string()).await),
            None => {
                debug!(source_id, "commerce disabled, skipping products");
                None
            }
        };

        let background_image_id = self.background_image(fields, page_id, source.as_ref()).await?;

        let instructor = if record.instructor.trim().is_empty() {
            UNKNOWN_INSTRUCTOR.to_string()
        } else {
            record.instructor.clone()
        };
        let updates = [
            (PageField::CustomTitle, title.clone()),
            (PageField::BackgroundImage, background_image_id.to_string()),
            (PageField::Content, record.content.clone()),
            (PageField::Price, record.price_string()),
            (PageField::Instructor, instructor),
            (PageField::Categories, record.first_category().unwrap_or_default().to_string()),
            (PageField::Students, record.students.to_string()),
            (PageField::Views, record.views.to_string()),
            (PageField::InstructorPosition, String::new()),
            (PageField::InstructorBio, String::new()),
            (PageField::VideoTrailer, String::new()),
        ];
        for (field, value) in &updates {
            fields.update(page_id, *field, value).await?;
        }

        repository::touch_page_modified(&self.db, page_id).await?;
        info!(source_id, page_id, created, "course page synced");

        Ok(UpsertOutcome {
            page_id,
            created,
            products,
        })
    }

    /// Stored field, then the raw URL meta resolved to an attachment, then the
    /// source thumbnail, then the default image.
    async fn background_image(
        &self,
        fields: &FieldStore,
        page_id: i64,
        source: Option<&SourceCourse>,
    ) -> Result<i64, SyncError> {
        if let Some(id) = fields
            .get(page_id, PageField::BackgroundImage)
            .await?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
        {
            return Ok(id);
        }

        if let Some(url) = self
            .meta
            .get_key(Scope::Page(page_id), MetaKey::BackgroundImageUrl)
            .await?
            .filter(|u| is_valid_url(u))
        {
            if let Some(id) = repository::attachment_id_by_url(&self.db, url.trim()).await? {
                fields.update(page_id, PageField::BackgroundImage, &id.to_string()).await?;
                return Ok(id);
            }
        }

        let id = source_thumbnail(source).unwrap_or(self.default_image_id);
        fields.update(page_id, PageField::BackgroundImage, &id.to_string()).await?;
        Ok(id)
    }
}

/// Cleaned title shared by the page and both products.
pub fn page_title(source_id: i64, raw: &str) -> String {
    match clean_title(raw) {
        t if t.is_empty() => format!("Course {}", source_id),
        t => t,
    }
}

fn source_thumbnail(source: Option<&SourceCourse>) -> Option<i64> {
    source.and_then(|s| s.thumbnail_id).filter(|id| *id > 0)
}
