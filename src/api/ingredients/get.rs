use crate::api::ingredients::list::IngredientView;
use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Ingredient;
use crate::schema::ingredients;
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
    path = "/api/ingredients/{id}",
    tag = "ingredients",
    params(
        ("id" = Uuid, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 200, description = "Ingredient details", body = IngredientView),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    )
)]
pub async fn get_ingredient(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match ingredients::table
        .find(id)
        .select(Ingredient::as_select())
        .first(&mut conn)
    {
        Ok(ingredient) => (StatusCode::OK, Json(IngredientView::from(ingredient))).into_response(),
        Err(diesel::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Ingredient not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch ingredient: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch ingredient".to_string(),
                }),
            )
                .into_response()
        }
    }
}
