use crate::api::recipes::view::AuthorView;
use crate::api::ErrorResponse;
use crate::auth::OptionalAuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::User;
use crate::schema::{subscriptions, users};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = AuthorView),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_profile(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let user: User = match users::table
        .find(id)
        .select(User::as_select())
        .first(&mut conn)
    {
        Ok(u) => u,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "User not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch user".to_string(),
                }),
            )
                .into_response();
        }
    };

    // Anonymous viewers have no subscriptions by definition
    let is_subscribed = match viewer {
        Some(viewer) => match subscriptions::table
            .filter(subscriptions::author_id.eq(id))
            .filter(subscriptions::subscriber_id.eq(viewer.id))
            .select(subscriptions::id)
            .first::<Uuid>(&mut conn)
            .optional()
        {
            Ok(row) => row.is_some(),
            Err(e) => {
                tracing::error!("Failed to check subscription: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to fetch user".to_string(),
                    }),
                )
                    .into_response();
            }
        },
        None => false,
    };

    (
        StatusCode::OK,
        Json(AuthorView {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }),
    )
        .into_response()
}
