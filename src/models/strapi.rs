use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StrapiCourse {
    pub id: i64,
    pub document_id: String,
    pub strapi_id: String,
    pub title: String,
    pub description: String,
    pub regular_price: f64,
    pub sales_price: f64,
    pub instructor: String,
    pub instructor_position: String,
    pub instructor_bio: String,
    pub status: String,
    pub updated_at: String,
}

/// A course as parsed from the Strapi collection, already sanitized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrapiCourseInput {
    pub document_id: String,
    pub strapi_id: String,
    pub title: String,
    pub description: String,
    pub regular_price: f64,
    pub sales_price: f64,
    pub instructor: String,
    pub instructor_position: String,
    pub instructor_bio: String,
}
