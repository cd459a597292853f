use serde::Deserialize;
use serde_json::Value;

/// `GET {STRAPI_API_URL}` response body.
#[derive(Debug, Deserialize)]
pub struct CollectionResponse {
    pub data: Vec<CourseEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CourseEntry {
    #[serde(rename = "documentId", default)]
    pub document_id: Option<String>,
    #[serde(rename = "id", default)]
    pub id: Value,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default)]
    pub course_description: Option<Vec<Block>>,
    #[serde(default)]
    pub course_regular_price: Value,
    #[serde(default)]
    pub course_sales_price: Value,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub instructor_position: Option<String>,
    #[serde(default)]
    pub instructor_biography: Option<Vec<Block>>,
}

/// Rich-text paragraph.
#[derive(Debug, Default, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub children: Vec<Inline>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Inline {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}
