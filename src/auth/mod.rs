//! Caller identity, admin capability checks and anti-replay tokens.

pub mod nonce;
pub mod signature;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use tracing::debug;

use crate::db::repository;
use crate::error::AppError;
use crate::state::AppState;

pub use nonce::NonceIssuer;
pub use signature::{hash_token, sign_payload, verify_payload};

/// Action name the batch endpoint's nonce is issued for.
pub const CREATE_PAGES_ACTION: &str = "create_initial_course_pages";

/// User resolved from an `Authorization: Bearer <api token>` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub is_admin: bool,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".to_string())
        })?;

        let (user_id, is_admin) = repository::find_user_by_token_hash(&state.db, &hash_token(token.trim()))
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid API token".to_string()))?;

        Ok(AuthUser { user_id, is_admin })
    }
}

/// Like [`AuthUser`] but anonymous callers pass through as `None`.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized(reason)) => {
                debug!("treating caller as anonymous: {}", reason);
                Ok(MaybeUser(None))
            }
            Err(e) => Err(e),
        }
    }
}

/// Admin-only routes that do not go through the AJAX envelope.
pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Permission denied".to_string()))
    }
}

/// Nonce first, then capability. Anonymous callers are checked against the
/// nonce issued to user 0.
pub fn authorize_ajax(
    nonces: &NonceIssuer,
    action: &str,
    user: Option<&AuthUser>,
    nonce: Option<&str>,
) -> Result<AuthUser, AppError> {
    let nonce = nonce
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Security error: Nonce missing".to_string()))?;

    let user_id = user.map(|u| u.user_id).unwrap_or(0);
    if !nonces.verify(nonce, action, user_id) {
        return Err(AppError::BadRequest("Security error: Invalid nonce".to_string()));
    }

    match user {
        Some(user) if user.is_admin => Ok(*user),
        _ => Err(AppError::Forbidden("Permission denied".to_string())),
    }
}
