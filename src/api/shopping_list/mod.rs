pub mod download;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/shopping-list endpoints (mounted at /api/shopping-list)
pub fn router() -> Router<AppState> {
    Router::new().route("/download", get(download::download_shopping_list))
}

#[derive(OpenApi)]
#[openapi(paths(download::download_shopping_list))]
pub struct ApiDoc;
