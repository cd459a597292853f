use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{
    CoursePage, Enrollment, Order, OrderItem, Product, SourceCourse, StrapiCourse,
    StrapiCourseInput, STATUS_DRAFT, STATUS_PUBLISH,
};

const SOURCE_COURSE_COLUMNS: &str = "id, title, content, slug, status, author_id, thumbnail_id, price, current_students, views, categories, updated_at";
const PAGE_COLUMNS: &str = "id, title, slug, status, author_id, thumbnail_id, created_at, modified_at";
const PRODUCT_COLUMNS: &str = "id, title, status, product_type, visibility, stock_status, price, regular_price, created_at, updated_at";

// ---------------------------------------------------------------------------
// Source courses
// ---------------------------------------------------------------------------

pub async fn find_source_course(db: &SqlitePool, id: i64) -> Result<Option<SourceCourse>, sqlx::Error> {
    sqlx::query_as::<_, SourceCourse>(&format!(
        "SELECT {} FROM source_courses WHERE id = ?",
        SOURCE_COURSE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn count_published_source_courses(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM source_courses WHERE status = ?")
        .bind(STATUS_PUBLISH)
        .fetch_one(db)
        .await
}

pub async fn list_published_source_course_ids(
    db: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM source_courses WHERE status = ? ORDER BY id ASC LIMIT ? OFFSET ?",
    )
    .bind(STATUS_PUBLISH)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn all_published_source_course_ids(db: &SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM source_courses WHERE status = ? ORDER BY id ASC")
        .bind(STATUS_PUBLISH)
        .fetch_all(db)
        .await
}

// ---------------------------------------------------------------------------
// Users and attachments
// ---------------------------------------------------------------------------

pub async fn find_user_display_name(db: &SqlitePool, id: i64) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT display_name FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Returns `(user_id, is_admin)` for an API token digest.
pub async fn find_user_by_token_hash(
    db: &SqlitePool,
    token_hash: &str,
) -> Result<Option<(i64, bool)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, bool)>("SELECT id, is_admin FROM users WHERE api_token_hash = ?")
        .bind(token_hash)
        .fetch_optional(db)
        .await
}

pub async fn attachment_id_by_url(db: &SqlitePool, url: &str) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM attachments WHERE url = ?")
        .bind(url)
        .fetch_optional(db)
        .await
}

// ---------------------------------------------------------------------------
// Course pages
// ---------------------------------------------------------------------------

pub async fn find_page(db: &SqlitePool, id: i64) -> Result<Option<CoursePage>, sqlx::Error> {
    sqlx::query_as::<_, CoursePage>(&format!(
        "SELECT {} FROM course_pages WHERE id = ?",
        PAGE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn count_pages(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM course_pages")
        .fetch_one(db)
        .await
}

pub async fn insert_page(
    db: &SqlitePool,
    title: &str,
    slug: &str,
    author_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO course_pages (title, slug, status, author_id, thumbnail_id, created_at, modified_at)
        VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)
        "#,
    )
    .bind(title)
    .bind(slug)
    .bind(STATUS_PUBLISH)
    .bind(author_id)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Returns false when no page with this id exists.
pub async fn update_page(
    db: &SqlitePool,
    id: i64,
    title: &str,
    slug: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let affected = sqlx::query(
        "UPDATE course_pages SET title = ?, slug = ?, status = ?, modified_at = ? WHERE id = ?",
    )
    .bind(title)
    .bind(slug)
    .bind(STATUS_PUBLISH)
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

pub async fn set_page_thumbnail(db: &SqlitePool, id: i64, thumbnail_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE course_pages SET thumbnail_id = ? WHERE id = ?")
        .bind(thumbnail_id)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn touch_page_modified(db: &SqlitePool, id: i64) -> Result<String, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE course_pages SET modified_at = ? WHERE id = ?")
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(now)
}

pub async fn list_published_page_ids(
    db: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM course_pages WHERE status = ? ORDER BY id ASC LIMIT ? OFFSET ?",
    )
    .bind(STATUS_PUBLISH)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub async fn find_product(db: &SqlitePool, id: i64) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = ?",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn count_products(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(db)
        .await
}

/// Creates a published, visible, in-stock simple product.
pub async fn insert_product(db: &SqlitePool, title: &str, price: &str) -> Result<i64, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO products
            (title, status, product_type, visibility, stock_status, price, regular_price, created_at, updated_at)
        VALUES (?1, ?2, 'simple', 'visible', 'instock', ?3, ?3, ?4, ?4)
        "#,
    )
    .bind(title)
    .bind(STATUS_PUBLISH)
    .bind(price)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Rewrites title and price and resets type, visibility and stock flags.
pub async fn update_product(
    db: &SqlitePool,
    id: i64,
    title: &str,
    price: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let affected = sqlx::query(
        r#"
        UPDATE products
        SET title = ?1,
            status = ?2,
            product_type = 'simple',
            visibility = 'visible',
            stock_status = 'instock',
            price = ?3,
            regular_price = ?3,
            updated_at = ?4
        WHERE id = ?5
        "#,
    )
    .bind(title)
    .bind(STATUS_PUBLISH)
    .bind(price)
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

pub async fn set_product_status(db: &SqlitePool, id: i64, status: &str) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE products SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Orders and enrollments
// ---------------------------------------------------------------------------

pub async fn find_order(db: &SqlitePool, id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT id, user_id, status FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_order_items(db: &SqlitePool, order_id: i64) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, quantity FROM order_items WHERE order_id = ? ORDER BY id ASC",
    )
    .bind(order_id)
    .fetch_all(db)
    .await
}

pub async fn enrollment_exists(db: &SqlitePool, user_id: i64, course_id: i64) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn insert_enrollment(db: &SqlitePool, user_id: i64, course_id: i64) -> Result<i64, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO enrollments (user_id, course_id, progress_percent, status, start_time)
        VALUES (?, ?, 0, 'enrolled', ?)
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn fetch_enrollments_for_user(db: &SqlitePool, user_id: i64) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, user_id, course_id, progress_percent, status, start_time
        FROM enrollments
        WHERE user_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

// ---------------------------------------------------------------------------
// Strapi courses
// ---------------------------------------------------------------------------

pub async fn find_strapi_course(db: &SqlitePool, document_id: &str) -> Result<Option<StrapiCourse>, sqlx::Error> {
    sqlx::query_as::<_, StrapiCourse>(
        r#"
        SELECT id, document_id, strapi_id, title, description, regular_price, sales_price,
               instructor, instructor_position, instructor_bio, status, updated_at
        FROM strapi_courses
        WHERE document_id = ?
        "#,
    )
    .bind(document_id)
    .fetch_optional(db)
    .await
}

/// Inserts a new course as a draft or, when the document id is known,
/// rewrites it and publishes it. Returns true when a row was created.
pub async fn upsert_strapi_course(db: &SqlitePool, course: &StrapiCourseInput) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    match find_strapi_course(db, &course.document_id).await? {
        Some(_) => {
            sqlx::query(
                r#"
                UPDATE strapi_courses
                SET title = ?, description = ?, regular_price = ?, sales_price = ?,
                    instructor = ?, instructor_position = ?, instructor_bio = ?,
                    status = ?, updated_at = ?
                WHERE document_id = ?
                "#,
            )
            .bind(&course.title)
            .bind(&course.description)
            .bind(course.regular_price)
            .bind(course.sales_price)
            .bind(&course.instructor)
            .bind(&course.instructor_position)
            .bind(&course.instructor_bio)
            .bind(STATUS_PUBLISH)
            .bind(&now)
            .bind(&course.document_id)
            .execute(db)
            .await?;
            Ok(false)
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO strapi_courses
                    (document_id, strapi_id, title, description, regular_price, sales_price,
                     instructor, instructor_position, instructor_bio, status, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&course.document_id)
            .bind(&course.strapi_id)
            .bind(&course.title)
            .bind(&course.description)
            .bind(course.regular_price)
            .bind(course.sales_price)
            .bind(&course.instructor)
            .bind(&course.instructor_position)
            .bind(&course.instructor_bio)
            .bind(STATUS_DRAFT)
            .bind(&now)
            .execute(db)
            .await?;
            Ok(true)
        }
    }
}
