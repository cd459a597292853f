use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::STATUS_PUBLISH;

pub const UNKNOWN_INSTRUCTOR: &str = "Unknown Instructor";

/// An LMS course as stored locally. This is the entity every course page and
/// product hangs off.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SourceCourse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub status: String,
    pub author_id: Option<i64>,
    pub thumbnail_id: Option<i64>,
    pub price: f64,
    pub current_students: i64,
    pub views: i64,
    /// JSON array of category names.
    pub categories: String,
    pub updated_at: String,
}

impl SourceCourse {
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISH
    }

    pub fn category_names(&self) -> Vec<String> {
        serde_json::from_str(&self.categories).unwrap_or_default()
    }
}

/// Normalized course data handed to the page upsert. Built fresh on every
/// sync, never stored as such.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub title: String,
    pub content: String,
    pub permalink: String,
    pub price: f64,
    pub instructor: String,
    /// Attachment id (as digits) or an image URL.
    pub instructor_photo: String,
    pub categories: Vec<String>,
    pub students: u64,
    pub views: u64,
}

impl CourseRecord {
    /// Price as stored on pages and products: `49`, `49.5`.
    pub fn price_string(&self) -> String {
        format_price(self.price)
    }

    pub fn first_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }
}

pub fn format_price(price: f64) -> String {
    if price.is_finite() {
        format!("{}", price)
    } else {
        "0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_string_has_no_currency_formatting() {
        let mut record = CourseRecord { price: 49.0, ..Default::default() };
        assert_eq!(record.price_string(), "49");
        record.price = 49.5;
        assert_eq!(record.price_string(), "49.5");
    }
}
