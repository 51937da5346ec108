use crate::api::ErrorResponse;
use crate::auth::{create_session, hash_password};
use crate::db::DbPool;
use crate::get_conn;
use crate::models::NewUser;
use crate::schema::users;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Reject structurally invalid signup input with a field-attributed message.
fn validate_signup(req: &SignupRequest) -> Result<(), String> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err("A valid email is required".to_string());
    }
    if req.username.trim().is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if req.first_name.trim().is_empty() {
        return Err("First name cannot be empty".to_string());
    }
    if req.last_name.trim().is_empty() {
        return Err("Last name cannot be empty".to_string());
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = SignupResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(pool): State<Arc<DbPool>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    if let Err(message) = validate_signup(&req) {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response();
    }

    let mut conn = get_conn!(pool);

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to hash password".to_string(),
                }),
            )
                .into_response()
        }
    };

    let new_user = NewUser {
        email: &req.email,
        username: &req.username,
        first_name: &req.first_name,
        last_name: &req.last_name,
        password_hash: &password_hash,
    };

    let user_id: Uuid = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(users::id)
        .get_result(&mut conn)
    {
        Ok(id) => id,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "Email already registered".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create user".to_string(),
                }),
            )
                .into_response();
        }
    };

    let token = match create_session(&mut conn, user_id) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create session".to_string(),
                }),
            )
                .into_response();
        }
    };

    (StatusCode::CREATED, Json(SignupResponse { user_id, token })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SignupRequest {
        SignupRequest {
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Carla".to_string(),
            last_name: "Cook".to_string(),
            password: "longenough".to_string(),
        }
    }

    #[test]
    fn test_valid_signup_passes() {
        assert!(validate_signup(&request()).is_ok());
    }

    #[test]
    fn test_email_without_at_sign_rejected() {
        let mut req = request();
        req.email = "not-an-email".to_string();
        assert!(validate_signup(&req).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        let mut req = request();
        req.password = "short".to_string();
        assert!(validate_signup(&req).is_err());
    }

    #[test]
    fn test_blank_names_rejected() {
        let mut req = request();
        req.first_name = "  ".to_string();
        assert!(validate_signup(&req).is_err());
    }
}
