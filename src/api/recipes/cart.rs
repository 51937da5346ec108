use crate::api::recipes::view::RecipeBrief;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewCartEntry, Recipe};
use crate::schema::{recipes, shopping_cart};
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
    path = "/api/recipes/{id}/cart",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 201, description = "Recipe added to shopping cart", body = RecipeBrief),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 409, description = "Recipe already in cart", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_to_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let recipe: Recipe = match recipes::table
        .find(id)
        .select(Recipe::as_select())
        .first(&mut conn)
    {
        Ok(r) => r,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Recipe not found".to_string(),
                }),
            )
                .into_response()
        }
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

    // Same double layer as favorites: friendly pre-check, constraint backstop
    let already: Option<Uuid> = match shopping_cart::table
        .filter(shopping_cart::user_id.eq(user.id))
        .filter(shopping_cart::recipe_id.eq(id))
        .select(shopping_cart::id)
        .first(&mut conn)
        .optional()
    {
        Ok(row) => row,
        Err(e) => {
            tracing::error!("Failed to check shopping cart: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to add to shopping cart".to_string(),
                }),
            )
                .into_response();
        }
    };

    if already.is_some() {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "Recipe is already in shopping cart".to_string(),
            }),
        )
            .into_response();
    }

    let result = diesel::insert_into(shopping_cart::table)
        .values(NewCartEntry {
            user_id: user.id,
            recipe_id: id,
        })
        .execute(&mut conn);

    match result {
        Ok(_) => (StatusCode::CREATED, Json(RecipeBrief::from(recipe))).into_response(),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "Recipe is already in shopping cart".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to add to shopping cart: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to add to shopping cart".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/cart",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe removed from shopping cart"),
        (status = 400, description = "Recipe is not in the cart", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_from_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let removed = match diesel::delete(
        shopping_cart::table
            .filter(shopping_cart::user_id.eq(user.id))
            .filter(shopping_cart::recipe_id.eq(id)),
    )
    .execute(&mut conn)
    {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Failed to remove from shopping cart: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to remove from shopping cart".to_string(),
                }),
            )
                .into_response();
        }
    };

    if removed == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Recipe is not in shopping cart".to_string(),
            }),
        )
            .into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}
