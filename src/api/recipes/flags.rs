use crate::schema::{favorites, shopping_cart};
use diesel::prelude::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Per-viewer relationship flags for one recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Compute favorited/in-cart flags for a whole result set at once.
///
/// One membership query per flag covering every recipe id, instead of an
/// existence probe per recipe. An anonymous viewer gets all-false flags
/// without touching the database.
pub fn relation_flags(
    conn: &mut PgConnection,
    viewer: Option<Uuid>,
    recipe_ids: &[Uuid],
) -> Result<HashMap<Uuid, RelationFlags>, diesel::result::Error> {
    let viewer_id = match viewer {
        Some(id) if !recipe_ids.is_empty() => id,
        _ => return Ok(all_false(recipe_ids)),
    };

    let favorited: HashSet<Uuid> = favorites::table
        .filter(favorites::user_id.eq(viewer_id))
        .filter(favorites::recipe_id.eq_any(recipe_ids))
        .select(favorites::recipe_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();

    let in_cart: HashSet<Uuid> = shopping_cart::table
        .filter(shopping_cart::user_id.eq(viewer_id))
        .filter(shopping_cart::recipe_id.eq_any(recipe_ids))
        .select(shopping_cart::recipe_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();

    Ok(fold_flags(recipe_ids, &favorited, &in_cart))
}

fn all_false(recipe_ids: &[Uuid]) -> HashMap<Uuid, RelationFlags> {
    recipe_ids
        .iter()
        .map(|&id| (id, RelationFlags::default()))
        .collect()
}

fn fold_flags(
    recipe_ids: &[Uuid],
    favorited: &HashSet<Uuid>,
    in_cart: &HashSet<Uuid>,
) -> HashMap<Uuid, RelationFlags> {
    recipe_ids
        .iter()
        .map(|&id| {
            (
                id,
                RelationFlags {
                    is_favorited: favorited.contains(&id),
                    is_in_shopping_cart: in_cart.contains(&id),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_marks_only_matching_recipes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let favorited: HashSet<Uuid> = [a].into_iter().collect();
        let in_cart: HashSet<Uuid> = [a, b].into_iter().collect();

        let flags = fold_flags(&[a, b, c], &favorited, &in_cart);

        assert_eq!(
            flags[&a],
            RelationFlags {
                is_favorited: true,
                is_in_shopping_cart: true
            }
        );
        assert_eq!(
            flags[&b],
            RelationFlags {
                is_favorited: false,
                is_in_shopping_cart: true
            }
        );
        assert_eq!(flags[&c], RelationFlags::default());
    }

    #[test]
    fn test_fold_is_deterministic() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let favorited: HashSet<Uuid> = ids[..2].iter().copied().collect();
        let in_cart = HashSet::new();

        let first = fold_flags(&ids, &favorited, &in_cart);
        let second = fold_flags(&ids, &favorited, &in_cart);
        assert_eq!(first, second);
    }

    #[test]
    fn test_anonymous_viewer_gets_all_false() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let flags = all_false(&ids);
        assert!(flags.values().all(|f| !f.is_favorited && !f.is_in_shopping_cart));
        assert_eq!(flags.len(), 2);
    }
}
