//! admin-ajax style envelope: `{ "success": bool, "data": ... }`.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct AjaxResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> AjaxResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

/// Error rendered as `{ "success": false, "data": { "message": ... } }` with
/// the status code of the wrapped error.
#[derive(Debug)]
pub struct AjaxError(pub AppError);

impl From<AppError> for AjaxError {
    fn from(e: AppError) -> Self {
        AjaxError(e)
    }
}

impl IntoResponse for AjaxError {
    fn into_response(self) -> Response {
        let (status, message) = self.0.status_and_message();
        let body = Json(json!({
            "success": false,
            "data": { "message": message },
        }));
        (status, body).into_response()
    }
}
