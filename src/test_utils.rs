//! Shared fixtures for unit tests: an in-memory database with migrations
//! applied and helpers that seed rows with sensible defaults.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Mutex;

use crate::config::{AppConfig, RetryPolicy};
use crate::services::fetcher::{CourseEndpoint, EndpointResponse, FetchError};

pub async fn setup_test_db() -> SqlitePool {
    // one connection, otherwise every connection gets its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn test_config() -> AppConfig {
    AppConfig {
        site_url: "https://academy.test".to_string(),
        course_endpoint_url: "https://academy.test/custom/v1/courses".to_string(),
        avatar_base_url: "https://academy.test/wp-content/uploads/stm_lms_avatars".to_string(),
        retry: RetryPolicy::immediate(3),
        default_image_id: 123,
        nonce_secret: "test-secret".to_string(),
        ..AppConfig::default()
    }
}

/// Seeds a source course priced at 49 with two categories.
pub async fn insert_source_course(pool: &SqlitePool, id: i64, title: &str, status: &str) {
    sqlx::query(
        r#"
        INSERT INTO source_courses
            (id, title, content, slug, status, author_id, thumbnail_id, price, current_students, views, categories)
        VALUES (?, ?, '<p>About the course</p>', ?, ?, NULL, NULL, 49, 10, 250, '["AI","Data"]')
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(crate::sanitize::sanitize_title(title))
    .bind(status)
    .execute(pool)
    .await
    .expect("Failed to insert source course");
}

pub async fn set_source_course_author(pool: &SqlitePool, id: i64, author_id: i64) {
    sqlx::query("UPDATE source_courses SET author_id = ? WHERE id = ?")
        .bind(author_id)
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to set author");
}

pub async fn set_source_course_thumbnail(pool: &SqlitePool, id: i64, thumbnail_id: i64) {
    sqlx::query("UPDATE source_courses SET thumbnail_id = ? WHERE id = ?")
        .bind(thumbnail_id)
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to set thumbnail");
}

pub async fn insert_user(pool: &SqlitePool, id: i64, display_name: &str, is_admin: bool) {
    sqlx::query("INSERT INTO users (id, display_name, is_admin) VALUES (?, ?, ?)")
        .bind(id)
        .bind(display_name)
        .bind(is_admin)
        .execute(pool)
        .await
        .expect("Failed to insert user");
}

pub async fn insert_attachment(pool: &SqlitePool, id: i64, url: &str) {
    sqlx::query("INSERT INTO attachments (id, url) VALUES (?, ?)")
        .bind(id)
        .bind(url)
        .execute(pool)
        .await
        .expect("Failed to insert attachment");
}

pub async fn insert_order(pool: &SqlitePool, id: i64, user_id: Option<i64>, product_ids: &[i64]) {
    sqlx::query("INSERT INTO orders (id, user_id, status) VALUES (?, ?, 'completed')")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to insert order");

    for product_id in product_ids {
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity) VALUES (?, ?, 1)")
            .bind(id)
            .bind(product_id)
            .execute(pool)
            .await
            .expect("Failed to insert order item");
    }
}

/// Endpoint that replays scripted responses and counts calls. Once the
/// script runs out it keeps answering 503.
pub struct ScriptedEndpoint {
    responses: Mutex<Vec<Result<EndpointResponse, FetchError>>>,
    pub calls: Mutex<u32>,
}

impl ScriptedEndpoint {
    pub fn new(mut responses: Vec<Result<EndpointResponse, FetchError>>) -> Arc<Self> {
        responses.reverse();
        Arc::new(Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(0),
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub async fn call_count(&self) -> u32 {
        *self.calls.lock().await
    }
}

#[async_trait]
impl CourseEndpoint for ScriptedEndpoint {
    async fn get_course(&self, _course_id: i64) -> Result<EndpointResponse, FetchError> {
        *self.calls.lock().await += 1;
        self.responses.lock().await.pop().unwrap_or(Ok(EndpointResponse {
            status: 503,
            body: String::new(),
        }))
    }
}

pub fn ok_json(body: serde_json::Value) -> Result<EndpointResponse, FetchError> {
    Ok(EndpointResponse {
        status: 200,
        body: body.to_string(),
    })
}
