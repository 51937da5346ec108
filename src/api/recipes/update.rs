use crate::api::recipes::payload::{self, RecipePayload};
use crate::api::recipes::view::{self, RecipeView};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::recipes;
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
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = RecipePayload,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeView),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecipePayload>,
) -> impl IntoResponse {
    if let Err(e) = payload::validate(&request) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response();
    }

    let (image, image_content_type) = match payload::decode_image(&request.image) {
        Ok(decoded) => decoded,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    };

    let mut conn = get_conn!(pool);

    // Only the author may update; anyone else sees a 404
    let owned: Option<Uuid> = match recipes::table
        .filter(recipes::id.eq(id))
        .filter(recipes::author_id.eq(user.id))
        .select(recipes::id)
        .first(&mut conn)
        .optional()
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if owned.is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response();
    }

    match payload::check_references(&mut conn, &request) {
        Ok(None) => {}
        Ok(Some(e)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to resolve recipe references: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    // Field update and the full relation-set replacement commit together, so
    // a concurrent reader never sees a half-updated recipe
    let result: Result<(), DieselError> = conn.transaction(|conn| {
        diesel::update(recipes::table.find(id))
            .set((
                recipes::name.eq(&request.name),
                recipes::text.eq(&request.text),
                recipes::image.eq(&image),
                recipes::image_content_type.eq(&image_content_type),
                recipes::cooking_time.eq(request.cooking_time),
            ))
            .execute(conn)?;

        payload::replace_relations(conn, id, &request)?;

        Ok(())
    });

    match result {
        Ok(()) => {}
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Referenced id not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to update recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    match view::load_recipe_view(&mut conn, Some(user.id), id) {
        Ok(Some(recipe)) => (StatusCode::OK, Json(recipe)).into_response(),
        Ok(None) | Err(_) => {
            tracing::error!("Failed to load recipe {} after update", id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load updated recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}
