use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Ingredient;
use crate::schema::ingredients;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListIngredientsParams {
    /// Case-insensitive name prefix filter
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientView {
    fn from(ingredient: Ingredient) -> Self {
        IngredientView {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientsResponse {
    pub ingredients: Vec<IngredientView>,
}

#[utoipa::path(
    get,
    path = "/api/ingredients",
    tag = "ingredients",
    params(ListIngredientsParams),
    responses(
        (status = 200, description = "Ingredients, ordered by name", body = IngredientsResponse)
    )
)]
pub async fn list_ingredients(
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListIngredientsParams>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let mut query = ingredients::table.into_boxed();

    if let Some(ref search) = params.search {
        let prefix = search.trim();
        if !prefix.is_empty() {
            let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
            query = query.filter(ingredients::name.ilike(pattern));
        }
    }

    let rows: Vec<Ingredient> = match query
        .order(ingredients::name.asc())
        .select(Ingredient::as_select())
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch ingredients: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch ingredients".to_string(),
                }),
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        Json(IngredientsResponse {
            ingredients: rows.into_iter().map(IngredientView::from).collect(),
        }),
    )
        .into_response()
}
