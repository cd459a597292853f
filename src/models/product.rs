use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::STATUS_PUBLISH;
use crate::fields::{MetaKey, PageField};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Standard,
    Live,
}

impl ProductKind {
    pub const ALL: [ProductKind; 2] = [ProductKind::Standard, ProductKind::Live];

    /// Where the source course keeps this kind's product id.
    pub const fn meta_key(self) -> MetaKey {
        match self {
            ProductKind::Standard => MetaKey::StandardProductId,
            ProductKind::Live => MetaKey::LiveProductId,
        }
    }

    /// Page field holding this kind's add-to-cart link.
    pub const fn link_field(self) -> PageField {
        match self {
            ProductKind::Standard => PageField::CourseProductLink,
            ProductKind::Live => PageField::WebinarProductLink,
        }
    }

    pub fn title_for(self, course_title: &str) -> String {
        match self {
            ProductKind::Standard => course_title.to_string(),
            ProductKind::Live => format!("Webinar - {}", course_title),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub product_type: String,
    pub visibility: String,
    pub stock_status: String,
    pub price: String,
    pub regular_price: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Product {
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISH
    }
}
