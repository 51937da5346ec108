use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::{DbConn, DbPool};
use crate::document::{self, DocumentLine};
use crate::get_conn;
use crate::schema::{ingredients, recipe_ingredients, shopping_cart};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use diesel::dsl::sum;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

/// Sum ingredient amounts over every recipe in the user's cart.
///
/// Grouping is by ingredient identity (name plus unit), so one ingredient
/// used by several cart recipes collapses into a single line with the total.
/// The whole aggregation is one grouped query, ordered by ingredient name.
fn aggregate_cart(
    conn: &mut DbConn,
    user_id: Uuid,
) -> Result<Vec<(String, String, i64)>, diesel::result::Error> {
    let rows: Vec<(String, String, Option<i64>)> = shopping_cart::table
        .inner_join(
            recipe_ingredients::table
                .on(recipe_ingredients::recipe_id.eq(shopping_cart::recipe_id)),
        )
        .inner_join(ingredients::table.on(ingredients::id.eq(recipe_ingredients::ingredient_id)))
        .filter(shopping_cart::user_id.eq(user_id))
        .group_by((ingredients::name, ingredients::measurement_unit))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            sum(recipe_ingredients::amount),
        ))
        .order(ingredients::name.asc())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(name, unit, total)| (name, unit, total.unwrap_or(0)))
        .collect())
}

fn to_document_lines(rows: Vec<(String, String, i64)>) -> Vec<DocumentLine> {
    rows.into_iter()
        .map(|(name, unit, total)| DocumentLine {
            label: name,
            value: format!("{} {}", total, unit),
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/shopping-list/download",
    tag = "shopping_list",
    responses(
        (status = 200, description = "Aggregated shopping list document", content_type = "text/plain"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_shopping_list(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let rows = match aggregate_cart(&mut conn, user.id) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to aggregate shopping cart: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to build shopping list".to_string(),
                }),
            )
                .into_response();
        }
    };

    let data = document::render("Shopping list", &to_document_lines(rows));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"shopping-list.txt\"",
        )
        .body(Body::from(data))
        .unwrap()
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_carry_amount_and_unit() {
        let lines = to_document_lines(vec![
            ("flour".to_string(), "g".to_string(), 500),
            ("milk".to_string(), "ml".to_string(), 200),
        ]);

        assert_eq!(
            lines,
            vec![
                DocumentLine {
                    label: "flour".to_string(),
                    value: "500 g".to_string(),
                },
                DocumentLine {
                    label: "milk".to_string(),
                    value: "200 ml".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_cart_renders_to_empty_line_list() {
        assert!(to_document_lines(Vec::new()).is_empty());
    }
}
