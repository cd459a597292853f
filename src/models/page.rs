use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoursePage {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub author_id: Option<i64>,
    pub thumbnail_id: Option<i64>,
    pub created_at: String,
    pub modified_at: String,
}

/// A page together with its structured fields keyed by logical field name.
#[derive(Debug, Clone, Serialize)]
pub struct CoursePageView {
    #[serde(flatten)]
    pub page: CoursePage,
    pub fields: BTreeMap<String, String>,
}
