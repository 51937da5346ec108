use crate::api::recipes::flags::relation_flags;
use crate::models::{Ingredient, Recipe, Tag, User};
use crate::schema::{
    ingredients, recipe_ingredients, recipe_tags, recipes, subscriptions, tags, users,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagView {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        TagView {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeIngredientView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe projection: fields, tag set, ingredient amounts, author and
/// the viewer's relationship flags.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<TagView>,
    pub author: AuthorView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Compact recipe shape used by favorite/cart confirmations and profile
/// recipe listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeBrief {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeBrief {
    fn from(recipe: Recipe) -> Self {
        RecipeBrief {
            id: recipe.id,
            name: recipe.name.clone(),
            image: data_url(&recipe.image, &recipe.image_content_type),
            cooking_time: recipe.cooking_time,
        }
    }
}

pub fn data_url(bytes: &[u8], content_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Load one recipe and assemble its full projection.
pub fn load_recipe_view(
    conn: &mut PgConnection,
    viewer: Option<Uuid>,
    recipe_id: Uuid,
) -> Result<Option<RecipeView>, diesel::result::Error> {
    let recipe = recipes::table
        .find(recipe_id)
        .select(Recipe::as_select())
        .first(conn)
        .optional()?;

    match recipe {
        Some(recipe) => Ok(load_recipe_views(conn, viewer, vec![recipe])?
            .into_iter()
            .next()),
        None => Ok(None),
    }
}

/// Assemble the full projection for a set of recipes.
///
/// Everything is loaded in batched queries keyed on the whole id set: one for
/// tags, one for ingredient amounts, one for authors, one membership query
/// per relationship flag. Nothing here is per-recipe.
pub fn load_recipe_views(
    conn: &mut PgConnection,
    viewer: Option<Uuid>,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeView>, diesel::result::Error> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();

    let mut tags_by_recipe: HashMap<Uuid, Vec<TagView>> = HashMap::new();
    let tag_rows: Vec<(Uuid, Tag)> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq_any(&recipe_ids))
        .order(tags::name.asc())
        .select((recipe_tags::recipe_id, Tag::as_select()))
        .load(conn)?;
    for (recipe_id, tag) in tag_rows {
        tags_by_recipe.entry(recipe_id).or_default().push(tag.into());
    }

    let mut ingredients_by_recipe: HashMap<Uuid, Vec<RecipeIngredientView>> = HashMap::new();
    let ingredient_rows: Vec<(Uuid, i32, Ingredient)> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(&recipe_ids))
        .order(ingredients::name.asc())
        .select((
            recipe_ingredients::recipe_id,
            recipe_ingredients::amount,
            Ingredient::as_select(),
        ))
        .load(conn)?;
    for (recipe_id, amount, ingredient) in ingredient_rows {
        ingredients_by_recipe
            .entry(recipe_id)
            .or_default()
            .push(RecipeIngredientView {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount,
            });
    }

    let author_ids: Vec<Uuid> = {
        let unique: HashSet<Uuid> = recipes.iter().map(|r| r.author_id).collect();
        unique.into_iter().collect()
    };
    let authors: HashMap<Uuid, User> = users::table
        .filter(users::id.eq_any(&author_ids))
        .select(User::as_select())
        .load::<User>(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let subscribed_to: HashSet<Uuid> = match viewer {
        Some(viewer_id) => subscriptions::table
            .filter(subscriptions::subscriber_id.eq(viewer_id))
            .filter(subscriptions::author_id.eq_any(&author_ids))
            .select(subscriptions::author_id)
            .load::<Uuid>(conn)?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let flags = relation_flags(conn, viewer, &recipe_ids)?;

    let views = recipes
        .into_iter()
        .filter_map(|recipe| {
            let author = authors.get(&recipe.author_id)?;
            let recipe_flags = flags.get(&recipe.id).copied().unwrap_or_default();
            Some(RecipeView {
                id: recipe.id,
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                author: AuthorView {
                    id: author.id,
                    email: author.email.clone(),
                    username: author.username.clone(),
                    first_name: author.first_name.clone(),
                    last_name: author.last_name.clone(),
                    is_subscribed: subscribed_to.contains(&author.id),
                },
                ingredients: ingredients_by_recipe
                    .remove(&recipe.id)
                    .unwrap_or_default(),
                is_favorited: recipe_flags.is_favorited,
                is_in_shopping_cart: recipe_flags.is_in_shopping_cart,
                name: recipe.name,
                image: data_url(&recipe.image, &recipe.image_content_type),
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                created_at: recipe.created_at,
            })
        })
        .collect();

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_round_trips_content_type() {
        let url = data_url(b"hello", "image/png");
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
    }
}
