//! Caller identity extraction.
//!
//! Authentication itself lives in the upstream gateway, which verifies the
//! session and forwards the caller's user id in the `X-User-Id` header.
//! Handlers that act on a user's hooks extract [`CallerIdentity`] and pass
//! the id down for ownership checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use hookflow_core::types::DbId;

use crate::error::AppError;

/// Header carrying the authenticated caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, as asserted by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: DbId,
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()))?;
        let user_id: DbId = header
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| AppError::Unauthorized("Invalid X-User-Id header".to_string()))?;
        Ok(Self { user_id })
    }
}
