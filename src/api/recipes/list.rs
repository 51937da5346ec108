use crate::api::recipes::view::{self, RecipeView};
use crate::api::ErrorResponse;
use crate::auth::OptionalAuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Recipe;
use crate::raw_sql::count_over;
use crate::schema::{favorites, recipe_tags, recipes, shopping_cart, tags};
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
pub struct ListRecipesParams {
    /// Number of items to return (default: 20, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Only recipes by this author
    pub author: Option<Uuid>,
    /// Comma-separated tag slugs; a recipe matches if it carries any of them
    pub tags: Option<String>,
    /// Only recipes the viewer has favorited (requires authentication)
    pub is_favorited: Option<bool>,
    /// Only recipes in the viewer's shopping cart (requires authentication)
    pub is_in_shopping_cart: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMetadata {
    /// Total number of items available
    pub total: i64,
    /// Number of items requested (limit)
    pub limit: i64,
    /// Number of items skipped (offset)
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeView>,
    pub pagination: PaginationMetadata,
}

/// Split a comma-separated slug list, dropping empty segments.
fn parse_tag_slugs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "List of recipes, newest first", body = ListRecipesResponse)
    )
)]
pub async fn list_recipes(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);
    let viewer_id = viewer.map(|u| u.id);

    // Viewer-relative filters can't match anything for an anonymous viewer
    let wants_viewer_filter =
        params.is_favorited == Some(true) || params.is_in_shopping_cart == Some(true);
    let viewer_id_for_filter = match (viewer_id, wants_viewer_filter) {
        (None, true) => {
            return (
                StatusCode::OK,
                Json(ListRecipesResponse {
                    recipes: Vec::new(),
                    pagination: PaginationMetadata {
                        total: 0,
                        limit,
                        offset,
                    },
                }),
            )
                .into_response()
        }
        (id, _) => id,
    };

    let mut conn = get_conn!(pool);

    let mut query = recipes::table.into_boxed();

    if let Some(author) = params.author {
        query = query.filter(recipes::author_id.eq(author));
    }

    if let Some(ref raw) = params.tags {
        let slugs = parse_tag_slugs(raw);
        if !slugs.is_empty() {
            query = query.filter(
                recipes::id.eq_any(
                    recipe_tags::table
                        .inner_join(tags::table)
                        .filter(tags::slug.eq_any(slugs))
                        .select(recipe_tags::recipe_id),
                ),
            );
        }
    }

    if params.is_favorited == Some(true) {
        if let Some(viewer_id) = viewer_id_for_filter {
            query = query.filter(
                recipes::id.eq_any(
                    favorites::table
                        .filter(favorites::user_id.eq(viewer_id))
                        .select(favorites::recipe_id),
                ),
            );
        }
    }

    if params.is_in_shopping_cart == Some(true) {
        if let Some(viewer_id) = viewer_id_for_filter {
            query = query.filter(
                recipes::id.eq_any(
                    shopping_cart::table
                        .filter(shopping_cart::user_id.eq(viewer_id))
                        .select(shopping_cart::recipe_id),
                ),
            );
        }
    }

    // COUNT(*) OVER() carries the pre-pagination total on every row
    let rows: Vec<(Recipe, i64)> = match query
        .order(recipes::created_at.desc())
        .select((Recipe::as_select(), count_over()))
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = rows.first().map(|(_, total)| *total).unwrap_or(0);
    let page: Vec<Recipe> = rows.into_iter().map(|(recipe, _)| recipe).collect();

    let recipes = match view::load_recipe_views(&mut conn, viewer_id, page) {
        Ok(views) => views,
        Err(e) => {
            tracing::error!("Failed to assemble recipe views: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        Json(ListRecipesResponse {
            recipes,
            pagination: PaginationMetadata {
                total,
                limit,
                offset,
            },
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_slug() {
        assert_eq!(parse_tag_slugs("dinner"), vec!["dinner"]);
    }

    #[test]
    fn test_parse_multiple_slugs() {
        assert_eq!(
            parse_tag_slugs("dinner,quick,veggie"),
            vec!["dinner", "quick", "veggie"]
        );
    }

    #[test]
    fn test_parse_trims_and_drops_empty_segments() {
        assert_eq!(parse_tag_slugs(" dinner , ,quick,"), vec!["dinner", "quick"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_tag_slugs("").is_empty());
    }
}
