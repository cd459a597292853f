#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use course_sync::api::router;
use course_sync::auth::hash_token;
use course_sync::config::{AppConfig, RetryPolicy};
use course_sync::services::fetcher::{CourseEndpoint, EndpointResponse, FetchError};
use course_sync::state::AppState;
use course_sync::strapi::NoopStrapiClient;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const EDITOR_TOKEN: &str = "editor-token";
pub const ADMIN_ID: i64 = 1;
pub const EDITOR_ID: i64 = 2;

/// Remote endpoint that is always down, so every fetch takes the local path.
pub struct OfflineEndpoint;

#[async_trait]
impl CourseEndpoint for OfflineEndpoint {
    async fn get_course(&self, _course_id: i64) -> Result<EndpointResponse, FetchError> {
        Err(FetchError::Transport("offline".to_string()))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        site_url: "https://academy.test".to_string(),
        retry: RetryPolicy::immediate(1),
        nonce_secret: "test-secret".to_string(),
        ..AppConfig::default()
    }
}

pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    for (id, name, is_admin, token) in [
        (ADMIN_ID, "Admin", true, ADMIN_TOKEN),
        (EDITOR_ID, "Editor", false, EDITOR_TOKEN),
    ] {
        sqlx::query("INSERT INTO users (id, display_name, is_admin, api_token_hash) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(is_admin)
            .bind(hash_token(token))
            .execute(&pool)
            .await
            .expect("Failed to insert user");
    }
    pool
}

pub fn state_with(pool: SqlitePool, config: AppConfig) -> AppState {
    AppState::new(pool, config, Arc::new(OfflineEndpoint), Arc::new(NoopStrapiClient))
}

pub fn app(state: AppState) -> Router {
    router(state)
}

pub async fn insert_course(pool: &SqlitePool, id: i64, title: &str, status: &str) {
    sqlx::query(
        "INSERT INTO source_courses (id, title, content, slug, status, price, current_students, views, categories) \
         VALUES (?, ?, '<p>About</p>', ?, ?, 49, 3, 20, '[\"AI\"]')",
    )
    .bind(id)
    .bind(title)
    .bind(format!("course-{}", id))
    .bind(status)
    .execute(pool)
    .await
    .expect("Failed to insert course");
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request failed")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not json")
}
