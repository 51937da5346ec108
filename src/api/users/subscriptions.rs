use crate::api::recipes::view::RecipeBrief;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::{DbConn, DbPool};
use crate::get_conn;
use crate::models::{Recipe, User};
use crate::schema::{recipes, subscriptions, users};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::dsl::count;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Author profile with their recipe count and (possibly truncated) recipes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes_count: i64,
    pub recipes: Vec<RecipeBrief>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscriptionsParams {
    /// Maximum number of recipes to list per author; the recipe count is
    /// unaffected. Absent means all recipes.
    pub recipes_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionView>,
}

/// Build the extended-profile views for a set of authors.
///
/// Recipe counts come from one grouped count over all the authors' recipes,
/// independent of `recipes_limit`; the limit only truncates the listings.
pub fn build_subscription_views(
    conn: &mut DbConn,
    authors: Vec<User>,
    recipes_limit: Option<usize>,
) -> Result<Vec<SubscriptionView>, diesel::result::Error> {
    if authors.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids: Vec<Uuid> = authors.iter().map(|u| u.id).collect();

    let counts: HashMap<Uuid, i64> = recipes::table
        .filter(recipes::author_id.eq_any(&author_ids))
        .group_by(recipes::author_id)
        .select((recipes::author_id, count(recipes::id)))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect();

    let mut recipes_by_author: HashMap<Uuid, Vec<RecipeBrief>> = HashMap::new();
    let recipe_rows: Vec<Recipe> = recipes::table
        .filter(recipes::author_id.eq_any(&author_ids))
        .order((recipes::author_id.asc(), recipes::created_at.desc()))
        .select(Recipe::as_select())
        .load(conn)?;
    for recipe in recipe_rows {
        recipes_by_author
            .entry(recipe.author_id)
            .or_default()
            .push(recipe.into());
    }

    truncate_listings(&mut recipes_by_author, recipes_limit);

    Ok(authors
        .into_iter()
        .map(|author| SubscriptionView {
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            recipes: recipes_by_author.remove(&author.id).unwrap_or_default(),
            id: author.id,
            email: author.email,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            is_subscribed: true,
        })
        .collect())
}

fn truncate_listings<T>(listings: &mut HashMap<Uuid, Vec<T>>, limit: Option<usize>) {
    if let Some(limit) = limit {
        for listing in listings.values_mut() {
            listing.truncate(limit);
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    tag = "users",
    params(SubscriptionsParams),
    responses(
        (status = 200, description = "Authors the user is subscribed to", body = SubscriptionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_subscriptions(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<SubscriptionsParams>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let authors: Vec<User> = match subscriptions::table
        .inner_join(users::table.on(users::id.eq(subscriptions::author_id)))
        .filter(subscriptions::subscriber_id.eq(user.id))
        .order(users::username.asc())
        .select(User::as_select())
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch subscriptions: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch subscriptions".to_string(),
                }),
            )
                .into_response();
        }
    };

    match build_subscription_views(&mut conn, authors, params.recipes_limit) {
        Ok(subscriptions) => {
            (StatusCode::OK, Json(SubscriptionsResponse { subscriptions })).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to assemble subscription views: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch subscriptions".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_limits_each_listing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut listings: HashMap<Uuid, Vec<i32>> =
            [(a, vec![1, 2, 3]), (b, vec![4])].into_iter().collect();

        truncate_listings(&mut listings, Some(2));

        assert_eq!(listings[&a], vec![1, 2]);
        assert_eq!(listings[&b], vec![4]);
    }

    #[test]
    fn test_no_limit_keeps_everything() {
        let a = Uuid::new_v4();
        let mut listings: HashMap<Uuid, Vec<i32>> = [(a, vec![1, 2, 3])].into_iter().collect();

        truncate_listings(&mut listings, None);

        assert_eq!(listings[&a], vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_limit_empties_listings() {
        let a = Uuid::new_v4();
        let mut listings: HashMap<Uuid, Vec<i32>> = [(a, vec![1, 2])].into_iter().collect();

        truncate_listings(&mut listings, Some(0));

        assert!(listings[&a].is_empty());
    }
}
