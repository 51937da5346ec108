use crate::api::users::subscriptions::{build_subscription_views, SubscriptionView};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewSubscription, User};
use crate::schema::{subscriptions, users};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "Author ID")
    ),
    responses(
        (status = 201, description = "Subscribed to author", body = SubscriptionView),
        (status = 400, description = "Self-subscription attempt", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse),
        (status = 409, description = "Already subscribed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn subscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    // Business rule first: no store state can make self-subscription valid
    if id == user.id {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Cannot subscribe to yourself".to_string(),
            }),
        )
            .into_response();
    }

    let mut conn = get_conn!(pool);

    let author: User = match users::table
        .find(id)
        .select(User::as_select())
        .first(&mut conn)
    {
        Ok(u) => u,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Author not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch author: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to subscribe".to_string(),
                }),
            )
                .into_response();
        }
    };

    let already: Option<Uuid> = match subscriptions::table
        .filter(subscriptions::author_id.eq(id))
        .filter(subscriptions::subscriber_id.eq(user.id))
        .select(subscriptions::id)
        .first(&mut conn)
        .optional()
    {
        Ok(row) => row,
        Err(e) => {
            tracing::error!("Failed to check subscription: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to subscribe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if already.is_some() {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "Already subscribed to this author".to_string(),
            }),
        )
            .into_response();
    }

    let result = diesel::insert_into(subscriptions::table)
        .values(NewSubscription {
            author_id: id,
            subscriber_id: user.id,
        })
        .execute(&mut conn);

    match result {
        Ok(_) => {}
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "Already subscribed to this author".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to subscribe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to subscribe".to_string(),
                }),
            )
                .into_response();
        }
    }

    match build_subscription_views(&mut conn, vec![author], None) {
        Ok(mut views) if !views.is_empty() => {
            (StatusCode::CREATED, Json(views.remove(0))).into_response()
        }
        Ok(_) | Err(_) => {
            tracing::error!("Failed to load author {} after subscribe", id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load subscription".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Unsubscribed from author"),
        (status = 400, description = "Subscription does not exist", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let removed = match diesel::delete(
        subscriptions::table
            .filter(subscriptions::author_id.eq(id))
            .filter(subscriptions::subscriber_id.eq(user.id)),
    )
    .execute(&mut conn)
    {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Failed to unsubscribe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to unsubscribe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if removed == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Subscription does not exist".to_string(),
            }),
        )
            .into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}
