use crate::{
    error::{NotFoundError, QueryError, ValidationError},
    schema::{Id, RecipeShort},
};

use sqlx::{Pool, Postgres};

/// Per-user recipe collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }
}

pub async fn get_recipe_short(id: Id, pool: &Pool<Postgres>) -> Result<RecipeShort, potion::Error> {
    let row: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    row.ok_or_else(|| NotFoundError::new("No recipe exists with specified id").into())
}

pub async fn is_in_recipe_list(
    list: RecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let result: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

/// Adds a recipe to one of the user's lists. Adding twice is a no-op,
/// the returned flag tells whether anything changed.
pub async fn add_to_recipe_list(
    list: RecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(RecipeShort, bool), potion::Error> {
    let recipe = get_recipe_short(recipe_id, pool).await?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok((recipe, result.rows_affected() > 0))
}

/// Removes a recipe from one of the user's lists. Removing a recipe that
/// isn't in the list succeeds without changes; an unknown recipe is NotFound.
pub async fn remove_from_recipe_list(
    list: RecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    get_recipe_short(recipe_id, pool).await?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

async fn ensure_user_exists(user_id: Id, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    let row: Option<(Id,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    match row {
        Some(_) => Ok(()),
        None => Err(NotFoundError::new("No user exists with specified id").into()),
    }
}

pub async fn is_subscribed(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, potion::Error> {
    let result: Option<(Id,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(result.is_some())
}

/// Starts following `author_id`. Following twice is a no-op.
pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, potion::Error> {
    if user_id == author_id {
        return Err(ValidationError::new("author", "You can't subscribe to yourself").into());
    }
    ensure_user_exists(author_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

/// Stops following `author_id`. Not following is a successful no-op.
pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, potion::Error> {
    ensure_user_exists(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}
