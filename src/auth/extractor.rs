use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::models::User;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::db::get_user_from_token;

/// Extractor that validates the Authorization header and provides the
/// authenticated user. Rejects the request with 401 otherwise.
pub struct AuthUser(pub User);

/// Extractor for endpoints that are readable anonymously.
///
/// No Authorization header yields `OptionalAuthUser(None)`; a header that is
/// present but invalid is still rejected so a client with a stale token gets
/// a 401 instead of silently losing its per-user flags.
pub struct OptionalAuthUser(pub Option<User>);

pub enum AuthError {
    MissingHeader,
    InvalidHeader,
    InvalidFormat,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingHeader => (StatusCode::UNAUTHORIZED, "Missing Authorization header"),
            AuthError::InvalidHeader => (StatusCode::UNAUTHORIZED, "Invalid Authorization header"),
            AuthError::InvalidFormat => (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format",
            ),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
        };

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

async fn user_from_parts<S>(parts: &mut Parts, state: &S) -> Result<User, AuthError>
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    let pool = Arc::<DbPool>::from_ref(state);

    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeader)?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?;

    get_user_from_token(&pool, token)
        .await
        .ok_or(AuthError::InvalidToken)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        user_from_parts(parts, state).await.map(AuthUser)
    }
}

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.get(header::AUTHORIZATION).is_none() {
            return Ok(OptionalAuthUser(None));
        }
        user_from_parts(parts, state)
            .await
            .map(|user| OptionalAuthUser(Some(user)))
    }
}
