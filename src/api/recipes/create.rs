use crate::api::recipes::payload::{self, RecipePayload};
use crate::api::recipes::view::{self, RecipeView};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::NewRecipe;
use crate::schema::recipes;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = RecipePayload,
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeView),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
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
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    // Recipe row and both relation sets are written as one atomic unit
    let result: Result<Uuid, DieselError> = conn.transaction(|conn| {
        let new_recipe = NewRecipe {
            author_id: user.id,
            name: &request.name,
            text: &request.text,
            image: &image,
            image_content_type: &image_content_type,
            cooking_time: request.cooking_time,
        };

        let recipe_id: Uuid = diesel::insert_into(recipes::table)
            .values(&new_recipe)
            .returning(recipes::id)
            .get_result(conn)?;

        payload::replace_relations(conn, recipe_id, &request)?;

        Ok(recipe_id)
    });

    let recipe_id = match result {
        Ok(id) => id,
        // A referenced tag or ingredient deleted between the pre-check and the
        // insert trips the FK constraint; report it like the pre-check would
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
            tracing::error!("Failed to create recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    match view::load_recipe_view(&mut conn, Some(user.id), recipe_id) {
        Ok(Some(recipe)) => (StatusCode::CREATED, Json(recipe)).into_response(),
        Ok(None) | Err(_) => {
            tracing::error!("Failed to load recipe {} after create", recipe_id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load created recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}
