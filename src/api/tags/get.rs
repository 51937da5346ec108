use crate::api::recipes::view::TagView;
use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Tag;
use crate::schema::tags;
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
    path = "/api/tags/{id}",
    tag = "tags",
    params(
        ("id" = Uuid, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag details", body = TagView),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
pub async fn get_tag(State(pool): State<Arc<DbPool>>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match tags::table.find(id).select(Tag::as_select()).first(&mut conn) {
        Ok(tag) => (StatusCode::OK, Json(TagView::from(tag))).into_response(),
        Err(diesel::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Tag not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch tag: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch tag".to_string(),
                }),
            )
                .into_response()
        }
    }
}
