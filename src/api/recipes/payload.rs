use crate::models::{NewRecipeIngredient, NewRecipeTag};
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, tags};
use base64::Engine;
use diesel::prelude::*;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Ingredient reference with the amount this recipe needs.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Recipe fields shared by the create and update requests.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    /// Base64 image, either a data URL or raw base64
    pub image: String,
    pub cooking_time: i32,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Rejection reasons for a recipe payload, in the order they are checked.
/// Messages are stable so clients can rely on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Field {0} must contain at least one item")]
    EmptyCollection(&'static str),
    #[error("Field {0} contains duplicate ids")]
    DuplicateId(&'static str),
    #[error("Field {0} must be at least 1")]
    BelowMinimum(&'static str),
    #[error("Field image is not valid base64-encoded image data")]
    InvalidImage,
    #[error("Unknown tag id in field tags")]
    UnknownTag,
    #[error("Unknown ingredient id in field ingredients")]
    UnknownIngredient,
}

/// Validate everything that can be checked without touching the database.
///
/// Check order is fixed: required fields, then empty collections, then
/// duplicate ids, then per-item minimums. The first failure wins, which keeps
/// the reported message deterministic for any given payload.
pub fn validate(payload: &RecipePayload) -> Result<(), PayloadError> {
    if payload.name.trim().is_empty() {
        return Err(PayloadError::MissingField("name"));
    }
    if payload.text.trim().is_empty() {
        return Err(PayloadError::MissingField("text"));
    }
    if payload.image.trim().is_empty() {
        return Err(PayloadError::MissingField("image"));
    }

    if payload.tags.is_empty() {
        return Err(PayloadError::EmptyCollection("tags"));
    }
    if payload.ingredients.is_empty() {
        return Err(PayloadError::EmptyCollection("ingredients"));
    }

    if has_duplicates(payload.tags.iter().copied()) {
        return Err(PayloadError::DuplicateId("tags"));
    }
    if has_duplicates(payload.ingredients.iter().map(|i| i.id)) {
        return Err(PayloadError::DuplicateId("ingredients"));
    }

    if payload.cooking_time < 1 {
        return Err(PayloadError::BelowMinimum("cooking_time"));
    }
    if payload.ingredients.iter().any(|i| i.amount < 1) {
        return Err(PayloadError::BelowMinimum("ingredients.amount"));
    }

    Ok(())
}

fn has_duplicates(ids: impl Iterator<Item = Uuid>) -> bool {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return true;
        }
    }
    false
}

/// Decode the payload image into raw bytes plus a content type.
///
/// Accepts `data:image/png;base64,...` data URLs as well as bare base64.
pub fn decode_image(image: &str) -> Result<(Vec<u8>, String), PayloadError> {
    let (content_type, encoded) = match image.strip_prefix("data:") {
        Some(rest) => {
            let (content_type, encoded) = rest
                .split_once(";base64,")
                .ok_or(PayloadError::InvalidImage)?;
            (content_type.to_string(), encoded)
        }
        None => ("application/octet-stream".to_string(), image),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| PayloadError::InvalidImage)?;
    if bytes.is_empty() {
        return Err(PayloadError::InvalidImage);
    }

    Ok((bytes, content_type))
}

/// Verify that every referenced tag and ingredient id exists.
///
/// The payload has already passed `validate`, so the id lists are non-empty
/// and duplicate-free and a simple count comparison is enough. One query per
/// collection, regardless of its size.
pub fn check_references(
    conn: &mut PgConnection,
    payload: &RecipePayload,
) -> Result<Option<PayloadError>, diesel::result::Error> {
    let found_tags: i64 = tags::table
        .filter(tags::id.eq_any(&payload.tags))
        .count()
        .get_result(conn)?;
    if found_tags != payload.tags.len() as i64 {
        return Ok(Some(PayloadError::UnknownTag));
    }

    let ingredient_ids: Vec<Uuid> = payload.ingredients.iter().map(|i| i.id).collect();
    let found_ingredients: i64 = ingredients::table
        .filter(ingredients::id.eq_any(&ingredient_ids))
        .count()
        .get_result(conn)?;
    if found_ingredients != ingredient_ids.len() as i64 {
        return Ok(Some(PayloadError::UnknownIngredient));
    }

    Ok(None)
}

/// Replace the recipe's full tag and ingredient sets with the payload's.
///
/// Delete-then-insert, meant to run inside the caller's transaction so a
/// reader never observes a recipe with half its relations written. On create
/// the deletes are no-ops.
pub fn replace_relations(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    payload: &RecipePayload,
) -> Result<(), diesel::result::Error> {
    diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
        .execute(conn)?;
    diesel::delete(
        recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)),
    )
    .execute(conn)?;

    let tag_rows: Vec<NewRecipeTag> = payload
        .tags
        .iter()
        .map(|&tag_id| NewRecipeTag { recipe_id, tag_id })
        .collect();
    diesel::insert_into(recipe_tags::table)
        .values(&tag_rows)
        .execute(conn)?;

    let ingredient_rows: Vec<NewRecipeIngredient> = payload
        .ingredients
        .iter()
        .map(|item| NewRecipeIngredient {
            recipe_id,
            ingredient_id: item.id,
            amount: item.amount,
        })
        .collect();
    diesel::insert_into(recipe_ingredients::table)
        .values(&ingredient_rows)
        .execute(conn)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RecipePayload {
        RecipePayload {
            name: "Pancakes".to_string(),
            text: "Mix and fry.".to_string(),
            image: "data:image/png;base64,aGVsbG8=".to_string(),
            cooking_time: 15,
            tags: vec![Uuid::new_v4()],
            ingredients: vec![IngredientAmount {
                id: Uuid::new_v4(),
                amount: 200,
            }],
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert_eq!(validate(&payload()), Ok(()));
    }

    #[test]
    fn test_blank_name_is_missing_field() {
        let mut p = payload();
        p.name = "   ".to_string();
        assert_eq!(validate(&p), Err(PayloadError::MissingField("name")));
    }

    #[test]
    fn test_missing_field_reported_before_empty_collection() {
        let mut p = payload();
        p.text = String::new();
        p.tags.clear();
        assert_eq!(validate(&p), Err(PayloadError::MissingField("text")));
    }

    #[test]
    fn test_empty_tags_rejected() {
        let mut p = payload();
        p.tags.clear();
        assert_eq!(validate(&p), Err(PayloadError::EmptyCollection("tags")));
    }

    #[test]
    fn test_empty_ingredients_rejected() {
        let mut p = payload();
        p.ingredients.clear();
        assert_eq!(
            validate(&p),
            Err(PayloadError::EmptyCollection("ingredients"))
        );
    }

    #[test]
    fn test_duplicate_tag_ids_rejected() {
        let mut p = payload();
        let id = Uuid::new_v4();
        p.tags = vec![id, id];
        assert_eq!(validate(&p), Err(PayloadError::DuplicateId("tags")));
    }

    #[test]
    fn test_duplicate_ingredient_ids_rejected_before_amount_check() {
        let mut p = payload();
        let id = Uuid::new_v4();
        p.ingredients = vec![
            IngredientAmount { id, amount: 0 },
            IngredientAmount { id, amount: 5 },
        ];
        assert_eq!(validate(&p), Err(PayloadError::DuplicateId("ingredients")));
    }

    #[test]
    fn test_zero_cooking_time_rejected() {
        let mut p = payload();
        p.cooking_time = 0;
        assert_eq!(
            validate(&p),
            Err(PayloadError::BelowMinimum("cooking_time"))
        );
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut p = payload();
        p.ingredients[0].amount = 0;
        assert_eq!(
            validate(&p),
            Err(PayloadError::BelowMinimum("ingredients.amount"))
        );
    }

    #[test]
    fn test_decode_image_data_url() {
        let (bytes, content_type) = decode_image("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type, "image/png");
    }

    #[test]
    fn test_decode_image_bare_base64() {
        let (bytes, content_type) = decode_image("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type, "application/octet-stream");
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert_eq!(
            decode_image("data:image/png;base64,!!!"),
            Err(PayloadError::InvalidImage)
        );
        assert_eq!(decode_image("data:image/png,plain"), Err(PayloadError::InvalidImage));
    }
}
