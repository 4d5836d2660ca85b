use std::collections::HashMap;

use crate::{
    error::QueryError,
    pagination::{PageContext, PageRequest},
    schema::{AuthorRecipe, Id, RecipeShort, Subscription, UserProfile, UserProfileRow},
};

use sqlx::{Pool, Postgres};

use super::users::get_user_profile;

/// Attaches the newest `recipes_limit` recipes and the recipe count to each author
async fn with_recipes(
    authors: Vec<UserProfile>,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscription>, potion::Error> {
    if authors.is_empty() {
        return Ok(vec![]);
    }
    let ids: Vec<Id> = authors.iter().map(|author| author.id).collect();

    let recipes: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT e1.author_id, e1.id, e1.name, e1.image, e1.cooking_time
        FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.created_at DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) e1
        WHERE e1.position <= $2
        ORDER BY e1.author_id, e1.position
    ",
    )
    .bind(&ids)
    .bind(recipes_limit.max(0))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let counts: Vec<(Id, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;
    let counts: HashMap<Id, i64> = counts.into_iter().collect();

    let mut recipes_by_author: HashMap<Id, Vec<RecipeShort>> = HashMap::new();
    recipes.into_iter().for_each(|recipe| {
        recipes_by_author
            .entry(recipe.author_id)
            .or_default()
            .push(recipe.into())
    });

    Ok(authors
        .into_iter()
        .map(|author| Subscription {
            recipes: recipes_by_author.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author,
        })
        .collect())
}

async fn count_subscriptions(user_id: Id, pool: &Pool<Postgres>) -> Result<i64, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Authors followed by `user_id`, each with a preview of their recipes
pub async fn fetch_subscriptions(
    user_id: Id,
    recipes_limit: i64,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, potion::Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            TRUE AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.page_size)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.page > 1 => count_subscriptions(user_id, pool).await?,
        None => 0,
    };
    let authors = rows.into_iter().map(UserProfile::from).collect();
    let subscriptions = with_recipes(authors, recipes_limit, pool).await?;

    Ok(PageContext::from_rows(subscriptions, total_count, page))
}

pub async fn get_subscription(
    user_id: Id,
    author_id: Id,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    let author = get_user_profile(author_id, Some(user_id), pool).await?;

    let mut subscriptions = with_recipes(vec![author], recipes_limit, pool).await?;
    subscriptions
        .pop()
        .ok_or_else(|| potion::HtmlError::InternalServerError.new("Subscription vanished"))
}
