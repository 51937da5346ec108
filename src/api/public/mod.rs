pub mod auth;

use crate::AppState;
use axum::routing::post;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for public endpoints (no auth required)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(auth::signup::signup))
        .route("/api/auth/login", post(auth::login::login))
}

#[derive(OpenApi)]
#[openapi(
    paths(auth::signup::signup, auth::login::login),
    components(schemas(
        auth::signup::SignupRequest,
        auth::signup::SignupResponse,
        auth::login::LoginRequest,
        auth::login::LoginResponse,
    ))
)]
pub struct ApiDoc;
