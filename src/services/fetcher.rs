//! Retrieves a normalized course record: remote endpoint first, bounded
//! retry, then local source-course data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::CourseRecord;
use crate::services::course_record::{load_local, sanitize_record};

/// Transient failure of a single remote attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint answered with status {0}")]
    Status(u16),

    #[error("undecodable body: {0}")]
    Decode(String),

    #[error("course payload has no title")]
    MissingTitle,
}

#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait CourseEndpoint: Send + Sync {
    async fn get_course(&self, course_id: i64) -> Result<EndpointResponse, FetchError>;
}

pub struct HttpCourseEndpoint {
    client: Client,
    base_url: String,
}

impl HttpCourseEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CourseEndpoint for HttpCourseEndpoint {
    async fn get_course(&self, course_id: i64) -> Result<EndpointResponse, FetchError> {
        let url = format!("{}/{}", self.base_url, course_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(EndpointResponse { status, body })
    }
}

/// Remote payload. Every field is optional; prices and photos may arrive as
/// numbers or strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteCourse {
    title: Option<String>,
    content: Option<String>,
    permalink: Option<String>,
    price: Value,
    instructor: Option<String>,
    instructor_photo: Value,
    categories: Value,
    students: Value,
    views: Value,
}

impl RemoteCourse {
    fn into_record(self) -> Result<CourseRecord, FetchError> {
        let title = self.title.unwrap_or_default();
        if title.trim().is_empty() {
            return Err(FetchError::MissingTitle);
        }

        let categories = match self.categories {
            Value::Array(items) => items.iter().filter_map(value_as_string).collect(),
            _ => Vec::new(),
        };

        Ok(CourseRecord {
            title,
            content: self.content.unwrap_or_default(),
            permalink: self.permalink.unwrap_or_default(),
            price: value_as_f64(&self.price),
            instructor: self.instructor.unwrap_or_default(),
            instructor_photo: value_as_string(&self.instructor_photo).unwrap_or_default(),
            categories,
            students: value_as_count(&self.students),
            views: value_as_count(&self.views),
        })
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn value_as_count(value: &Value) -> u64 {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    raw.unsigned_abs()
}

pub struct CourseFetcher {
    db: SqlitePool,
    endpoint: Arc<dyn CourseEndpoint>,
    config: Arc<AppConfig>,
}

impl CourseFetcher {
    pub fn new(db: SqlitePool, endpoint: Arc<dyn CourseEndpoint>, config: Arc<AppConfig>) -> Self {
        Self { db, endpoint, config }
    }

    /// Never fails: exhausted retries fall through to local data, and a
    /// course that is neither remote nor published locally yields `None`.
    pub async fn fetch(&self, course_id: i64) -> Option<CourseRecord> {
        let retry = self.config.retry;

        for attempt in 1..=retry.max_attempts {
            match self.fetch_remote(course_id).await {
                Ok(record) => {
                    debug!(course_id, attempt, "fetched course from endpoint");
                    return Some(sanitize_record(record));
                }
                Err(e) => {
                    warn!(course_id, attempt, "course fetch attempt failed: {}", e);
                    if attempt < retry.max_attempts && !retry.delay.is_zero() {
                        tokio::time::sleep(retry.delay).await;
                    }
                }
            }
        }

        info!(course_id, "endpoint exhausted, reading local course data");
        match load_local(&self.db, &self.config, course_id).await {
            Ok(record) => record.map(sanitize_record),
            Err(e) => {
                warn!(course_id, "local course lookup failed: {}", e);
                None
            }
        }
    }

    async fn fetch_remote(&self, course_id: i64) -> Result<CourseRecord, FetchError> {
        let response = self.endpoint.get_course(course_id).await?;
        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status(response.status));
        }

        let payload: RemoteCourse = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        payload.into_record()
    }
}
