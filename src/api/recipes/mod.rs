pub mod cart;
pub mod create;
pub mod delete;
pub mod favorite;
pub mod flags;
pub mod get;
pub mod list;
pub mod payload;
pub mod update;
pub mod view;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route(
            "/{id}/favorite",
            post(favorite::add_favorite).delete(favorite::remove_favorite),
        )
        .route(
            "/{id}/cart",
            post(cart::add_to_cart).delete(cart::remove_from_cart),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_recipes,
        create::create_recipe,
        get::get_recipe,
        update::update_recipe,
        delete::delete_recipe,
        favorite::add_favorite,
        favorite::remove_favorite,
        cart::add_to_cart,
        cart::remove_from_cart,
    ),
    components(schemas(
        payload::RecipePayload,
        payload::IngredientAmount,
        view::RecipeView,
        view::RecipeBrief,
        view::TagView,
        view::AuthorView,
        view::RecipeIngredientView,
        list::ListRecipesResponse,
        list::PaginationMetadata,
    ))
)]
pub struct ApiDoc;
