pub mod dto;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::StrapiConfig;
use crate::error::AppError;
use crate::models::StrapiCourseInput;
use crate::sanitize::{sanitize_content, sanitize_text_field};

#[async_trait]
pub trait StrapiClient: Send + Sync {
    /// Every course in the collection, or only the one with `document_id`.
    async fn fetch_courses(&self, document_id: Option<&str>) -> Result<Vec<dto::CourseEntry>, AppError>;
}

pub struct StrapiHttpClient {
    client: Client,
    config: StrapiConfig,
}

impl StrapiHttpClient {
    pub fn new(config: StrapiConfig, timeout: std::time::Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn collection_url(&self, document_id: Option<&str>) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| AppError::Config(format!("STRAPI_API_URL is not a valid url: {}", e)))?;
        if let Some(document_id) = document_id {
            url.query_pairs_mut()
                .append_pair("filters[documentId][$eq]", document_id);
        }
        Ok(url)
    }
}

#[async_trait]
impl StrapiClient for StrapiHttpClient {
    async fn fetch_courses(&self, document_id: Option<&str>) -> Result<Vec<dto::CourseEntry>, AppError> {
        let url = self.collection_url(document_id)?;

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.config.api_token))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach Strapi: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("Strapi API error {}: {}", status, body)));
        }
        if body.trim().is_empty() {
            return Err(AppError::Upstream("Empty response from Strapi".to_string()));
        }

        let parsed: dto::CollectionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse: {}", e);
            AppError::Upstream(format!("Invalid data format from Strapi: {}", e))
        })?;

        let mut courses = parsed.data;
        if document_id.is_some() {
            courses.truncate(1);
        }
        Ok(courses)
    }
}

pub struct NoopStrapiClient;

#[async_trait]
impl StrapiClient for NoopStrapiClient {
    async fn fetch_courses(&self, _document_id: Option<&str>) -> Result<Vec<dto::CourseEntry>, AppError> {
        Ok(Vec::new())
    }
}

/// Sanitized course, or `None` when the entry has no document id or title.
pub fn parse_course(entry: &dto::CourseEntry) -> Option<StrapiCourseInput> {
    let document_id = sanitize_text_field(entry.document_id.as_deref().unwrap_or_default());
    let title = sanitize_text_field(entry.course_title.as_deref().unwrap_or_default());
    if document_id.is_empty() || title.is_empty() {
        return None;
    }

    Some(StrapiCourseInput {
        document_id,
        strapi_id: sanitize_text_field(&value_as_text(&entry.id)),
        title,
        description: flatten_rich_text(entry.course_description.as_deref()),
        regular_price: value_as_price(&entry.course_regular_price),
        sales_price: value_as_price(&entry.course_sales_price),
        instructor: sanitize_text_field(entry.instructor.as_deref().unwrap_or_default()),
        instructor_position: sanitize_text_field(entry.instructor_position.as_deref().unwrap_or_default()),
        instructor_bio: flatten_rich_text(entry.instructor_biography.as_deref()),
    })
}

/// Text children of every paragraph, one paragraph per non-empty text node,
/// separated by blank lines.
pub fn flatten_rich_text(blocks: Option<&[dto::Block]>) -> String {
    blocks
        .unwrap_or_default()
        .iter()
        .flat_map(|block| block.children.iter())
        .filter(|child| child.kind == "text" && !child.text.is_empty())
        .map(|child| sanitize_content(&child.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn value_as_price(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(value: Value) -> dto::CourseEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_rich_text_is_flattened_into_paragraphs() {
        let course = entry(json!({
            "id": 4,
            "documentId": "doc-1",
            "CourseTitle": "Prompting <b>101</b>",
            "CourseDescription": [
                { "type": "paragraph", "children": [{ "type": "text", "text": "First." }] },
                { "type": "paragraph", "children": [
                    { "type": "link", "url": "https://x.test" },
                    { "type": "text", "text": "" },
                    { "type": "text", "text": "Second <script>x()</script>line." }
                ] }
            ],
            "CourseRegularPrice": 120,
            "CourseSalesPrice": "99.5",
            "Instructor": " Ada ",
            "InstructorBiography": null
        }));

        let parsed = parse_course(&course).expect("course");
        assert_eq!(parsed.document_id, "doc-1");
        assert_eq!(parsed.strapi_id, "4");
        assert_eq!(parsed.title, "Prompting 101");
        assert_eq!(parsed.description, "First.\n\nSecond line.");
        assert_eq!(parsed.regular_price, 120.0);
        assert_eq!(parsed.sales_price, 99.5);
        assert_eq!(parsed.instructor, "Ada");
        assert_eq!(parsed.instructor_position, "");
        assert_eq!(parsed.instructor_bio, "");
    }

    #[test]
    fn test_entries_without_identity_are_rejected() {
        assert!(parse_course(&entry(json!({ "CourseTitle": "No id" }))).is_none());
        assert!(parse_course(&entry(json!({ "documentId": "doc-2" }))).is_none());
    }

    #[test]
    fn test_collection_url_encodes_document_filter() {
        let client = StrapiHttpClient::new(
            StrapiConfig {
                api_url: "https://cms.test/api/coursesv3s".to_string(),
                api_token: "token".to_string(),
            },
            std::time::Duration::from_secs(5),
        )
        .unwrap();

        let url = client.collection_url(Some("doc 1")).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("filters[documentId][$eq]".to_string(), "doc 1".to_string())]);
        assert_eq!(client.collection_url(None).unwrap().query(), None);
    }
}
