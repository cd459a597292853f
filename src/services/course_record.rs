//! Builds a course record straight from local source-course data. Serves the
//! public course endpoint and the fetcher's fallback path.

use std::sync::LazyLock;

use regex::Regex;
use sqlx::SqlitePool;
use tracing::debug;

use crate::config::AppConfig;
use crate::db::repository;
use crate::models::{CourseRecord, SourceCourse, UNKNOWN_INSTRUCTOR};
use crate::sanitize::{esc_url, sanitize_content, sanitize_text_field};

static INSTRUCTOR_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="masterstudy-single-course-instructor__name[^"]*"\s*href="[^"]*"\s*[^>]*>(.*?)<"#)
        .expect("valid regex")
});
static INSTRUCTOR_AVATAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="masterstudy-single-course-instructor__avatar[^"]*".*?src=["'](.*?)["']"#)
        .expect("valid regex")
});

/// Returns `None` when the source course does not exist or is not published.
pub async fn load_local(
    db: &SqlitePool,
    config: &AppConfig,
    course_id: i64,
) -> Result<Option<CourseRecord>, sqlx::Error> {
    let Some(course) = repository::find_source_course(db, course_id).await? else {
        debug!(course_id, "source course not found");
        return Ok(None);
    };
    if !course.is_published() {
        debug!(course_id, status = %course.status, "source course is not published");
        return Ok(None);
    }

    let (mut instructor, mut instructor_photo) = match course.author_id.filter(|id| *id > 0) {
        Some(author_id) => match repository::find_user_display_name(db, author_id).await? {
            Some(name) => {
                let photo_url = format!("{}/stm_lms_avatar{}.jpg", config.avatar_base_url, author_id);
                let photo = match repository::attachment_id_by_url(db, &photo_url).await? {
                    Some(attachment_id) => attachment_id.to_string(),
                    None => photo_url,
                };
                (name, photo)
            }
            None => {
                debug!(course_id, author_id, "no user found for course author");
                (String::new(), String::new())
            }
        },
        None => (String::new(), String::new()),
    };

    if instructor.trim().is_empty() {
        instructor = instructor_from_markup(&course.content).unwrap_or_else(|| UNKNOWN_INSTRUCTOR.to_string());
    }
    if instructor_photo.is_empty() {
        instructor_photo = avatar_from_markup(&course.content).unwrap_or_default();
    }

    Ok(Some(CourseRecord {
        title: course.title.clone(),
        content: course.content.clone(),
        permalink: permalink_for(config, &course),
        price: course.price,
        instructor,
        instructor_photo,
        categories: course.category_names(),
        students: course.current_students.max(0) as u64,
        views: course.views.max(0) as u64,
    }))
}

/// Applies the per-field sanitizers. Safe to run more than once.
pub fn sanitize_record(record: CourseRecord) -> CourseRecord {
    let instructor = sanitize_text_field(&record.instructor);
    CourseRecord {
        title: sanitize_text_field(&record.title),
        content: sanitize_content(&record.content),
        permalink: esc_url(&record.permalink),
        price: if record.price.is_finite() { record.price } else { 0.0 },
        instructor: if instructor.is_empty() {
            UNKNOWN_INSTRUCTOR.to_string()
        } else {
            instructor
        },
        instructor_photo: sanitize_text_field(&record.instructor_photo),
        categories: record
            .categories
            .iter()
            .map(|c| sanitize_text_field(c))
            .filter(|c| !c.is_empty())
            .collect(),
        students: record.students,
        views: record.views,
    }
}

fn permalink_for(config: &AppConfig, course: &SourceCourse) -> String {
    if course.slug.is_empty() {
        format!("{}/?p={}", config.site_url, course.id)
    } else {
        format!("{}/courses/{}/", config.site_url, course.slug)
    }
}

fn instructor_from_markup(content: &str) -> Option<String> {
    INSTRUCTOR_NAME_RE
        .captures(content)
        .map(|caps| sanitize_text_field(&caps[1]))
        .filter(|name| !name.is_empty())
}

fn avatar_from_markup(content: &str) -> Option<String> {
    INSTRUCTOR_AVATAR_RE
        .captures(content)
        .map(|caps| caps[1].trim().to_string())
        .filter(|src| !src.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        insert_attachment, insert_source_course, insert_user, set_source_course_author,
        setup_test_db, test_config,
    };

    const MARKUP: &str = r#"<div><img class="masterstudy-single-course-instructor__avatar" alt="" src="https://cdn.test/ana.jpg"><a class="masterstudy-single-course-instructor__name" href="https://academy.test/u/ana" target="_blank">Ana Ruiz</a></div>"#;

    #[tokio::test]
    async fn test_instructor_comes_from_author_and_avatar_attachment() {
        let pool = setup_test_db().await;
        let config = test_config();
        insert_source_course(&pool, 1, "Intro to Rust", "publish").await;
        insert_user(&pool, 9, "Grace Hopper", false).await;
        set_source_course_author(&pool, 1, 9).await;
        insert_attachment(&pool, 77, "https://academy.test/wp-content/uploads/stm_lms_avatars/stm_lms_avatar9.jpg").await;

        let record = load_local(&pool, &config, 1).await.unwrap().expect("record");
        assert_eq!(record.instructor, "Grace Hopper");
        assert_eq!(record.instructor_photo, "77");
        assert_eq!(record.permalink, "https://academy.test/courses/intro-to-rust/");
        assert_eq!(record.categories, vec!["AI", "Data"]);
        assert_eq!(record.students, 10);
        assert_eq!(record.views, 250);
    }

    #[tokio::test]
    async fn test_instructor_falls_back_to_markup_then_sentinel() {
        let pool = setup_test_db().await;
        let config = test_config();
        insert_source_course(&pool, 1, "With markup", "publish").await;
        insert_source_course(&pool, 2, "Without markup", "publish").await;
        sqlx::query("UPDATE source_courses SET content = ? WHERE id = 1")
            .bind(MARKUP)
            .execute(&pool)
            .await
            .unwrap();

        let record = load_local(&pool, &config, 1).await.unwrap().expect("record");
        assert_eq!(record.instructor, "Ana Ruiz");
        assert_eq!(record.instructor_photo, "https://cdn.test/ana.jpg");

        let record = load_local(&pool, &config, 2).await.unwrap().expect("record");
        assert_eq!(record.instructor, UNKNOWN_INSTRUCTOR);
        assert_eq!(record.instructor_photo, "");
    }

    #[tokio::test]
    async fn test_nested_name_markup_keeps_leading_text() {
        let pool = setup_test_db().await;
        insert_source_course(&pool, 1, "Nested", "publish").await;
        sqlx::query("UPDATE source_courses SET content = ? WHERE id = 1")
            .bind(r#"<a class="masterstudy-single-course-instructor__name" href="/u/ana">Ana <b>Ruiz</b></a>"#)
            .execute(&pool)
            .await
            .unwrap();

        let record = load_local(&pool, &test_config(), 1).await.unwrap().expect("record");
        assert_eq!(record.instructor, "Ana");
        assert_eq!(record.instructor_photo, "");
    }

    #[tokio::test]
    async fn test_unpublished_or_missing_course_has_no_record() {
        let pool = setup_test_db().await;
        let config = test_config();
        insert_source_course(&pool, 1, "Draft", "draft").await;

        assert!(load_local(&pool, &config, 1).await.unwrap().is_none());
        assert!(load_local(&pool, &config, 404).await.unwrap().is_none());
    }

    #[test]
    fn test_sanitize_record_cleans_every_field() {
        let record = sanitize_record(CourseRecord {
            title: " <em>Intro</em>  to Rust ".to_string(),
            content: "<p onclick=\"x\">Hi</p><iframe src=\"x\"></iframe>".to_string(),
            permalink: "javascript:alert(1)".to_string(),
            price: f64::NAN,
            instructor: "  ".to_string(),
            instructor_photo: "<b>77</b>".to_string(),
            categories: vec!["<i>AI</i>".to_string(), " ".to_string()],
            students: 3,
            views: 4,
        });

        assert_eq!(record.title, "Intro to Rust");
        assert_eq!(record.content, "<p>Hi</p>");
        assert_eq!(record.permalink, "");
        assert_eq!(record.price, 0.0);
        assert_eq!(record.instructor, UNKNOWN_INSTRUCTOR);
        assert_eq!(record.instructor_photo, "77");
        assert_eq!(record.categories, vec!["AI"]);
    }
}
