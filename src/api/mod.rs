pub mod ajax;

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, Query};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{self, AuthUser, CREATE_PAGES_ACTION, MaybeUser};
use crate::db::repository;
use crate::error::AppError;
use crate::models::{CoursePageView, CourseRecord, StrapiCourse};
use crate::notices::Notice;
use crate::sanitize::absint;
use crate::services::course_record::{load_local, sanitize_record};
use crate::services::resync::ResyncOutcome;
use crate::services::{BatchProgress, BatchRequest, StrapiSyncStats};
use crate::state::AppState;

use self::ajax::{AjaxError, AjaxResponse};

pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/custom/v1/courses/{id}", get(get_course))
        .route("/admin/nonce", get(issue_nonce))
        .route("/admin/ajax", post(admin_ajax))
        .route("/admin/courses/{id}/save", post(save_course))
        .route("/admin/course-pages/{id}", get(get_course_page))
        .route("/admin/strapi/sync", post(sync_strapi))
        .route("/admin/notices", get(drain_notices))
        .route("/strapi-courses/{document_id}", get(get_strapi_course))
        .route("/webhooks/order-completed", post(order_completed))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CourseRecord>, AppError> {
    let record = load_local(&state.db, &state.config, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(sanitize_record(record)))
}

#[derive(Deserialize)]
struct NonceQuery {
    action: String,
}

#[derive(Serialize)]
struct NonceResponse {
    nonce: String,
}

async fn issue_nonce(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NonceQuery>,
) -> Json<NonceResponse> {
    let user_id = user.map(|u| u.user_id).unwrap_or(0);
    Json(NonceResponse {
        nonce: state.nonces.create(&query.action, user_id),
    })
}

/// Fields are read leniently: a body that does not parse, a missing action or
/// a garbled offset all end up in the AJAX envelope rather than an extractor
/// rejection.
async fn admin_ajax(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Json<AjaxResponse<BatchProgress>>, AjaxError> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(format!("Invalid request: {}", e.body_text())))?;

    let action = form.get("action").map(|a| a.trim()).unwrap_or_default();
    if action != CREATE_PAGES_ACTION {
        return Err(AppError::BadRequest(format!("Unknown action: {}", action)).into());
    }

    let progress = state
        .orchestrator()
        .handle(BatchRequest {
            user,
            nonce: form.get("nonce").cloned(),
            offset: form.get("offset").map(|o| absint(o)).unwrap_or(0),
        })
        .await?;
    Ok(AjaxResponse::ok(progress))
}

#[derive(Deserialize)]
struct SaveCourseRequest {
    update_course_page: Option<String>,
}

async fn save_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<SaveCourseRequest>,
) -> Result<Json<ResyncOutcome>, AppError> {
    auth::require_admin(&user)?;
    repository::find_source_course(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let resync = state.resync();
    if let Some(flag) = req.update_course_page.as_deref() {
        resync.request(id, flag).await?;
    }
    let outcome = resync.on_save(id).await?;
    Ok(Json(outcome))
}

async fn get_course_page(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<CoursePageView>, AppError> {
    auth::require_admin(&user)?;
    let page = repository::find_page(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let fields = match state.field_store() {
        Some(store) => store.all_for_page(id).await?,
        None => Default::default(),
    };
    Ok(Json(CoursePageView { page, fields }))
}

async fn sync_strapi(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<StrapiSyncStats>, AppError> {
    auth::require_admin(&user)?;
    let stats = state.strapi_sync().sync_all().await?;
    Ok(Json(stats))
}

async fn drain_notices(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Notice>>, AppError> {
    auth::require_admin(&user)?;
    Ok(Json(state.notices.drain()))
}

async fn get_strapi_course(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<StrapiCourse>, AppError> {
    // a failed refresh still serves the stored copy
    if let Err(e) = state.strapi_sync().sync_one(&document_id).await {
        warn!(document_id = %document_id, "Strapi refresh failed: {}", e);
    }
    let course = repository::find_strapi_course(&state.db, &document_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

#[derive(Deserialize)]
struct OrderCompletedEvent {
    order_id: i64,
}

async fn order_completed(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get(WEBHOOK_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
        if !auth::verify_payload(secret, &body, signature) {
            return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
        }
    }

    let event: OrderCompletedEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid order event: {}", e)))?;

    let report = state.enrollment().on_order_completed(event.order_id).await;
    info!(
        order_id = report.order_id,
        enrolled = report.enrolled.len(),
        aborted = ?report.aborted,
        "order completed event handled"
    );
    Ok(StatusCode::NO_CONTENT)
}
