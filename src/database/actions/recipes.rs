use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::ActionType,
    error::{NotFoundError, PermissionError, QueryError},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    payload::{dedup_ingredients, dedup_tags, IngredientAmount, RecipePatch, RecipePayload},
    schema::{
        Id, Recipe, RecipeDetail, RecipeIngredient, RecipeRow, RecipeRowPartial, RecipeTag, Tag,
        UserProfile,
    },
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

/// Filters of `GET /recipes`. Membership flags are relative to the viewer.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

fn push_recipe_select(query: &mut QueryBuilder<'_, Postgres>, viewer: Option<Id>) {
    query.push(
        "SELECT r.id, r.author_id, r.name, r.text, r.cooking_time, r.image,
            EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query.push_bind(viewer);
    query.push(
        ") AS is_favorited,
            EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    query.push_bind(viewer);
    query.push(") AS is_in_shopping_cart");
}

fn push_membership_filter(
    query: &mut QueryBuilder<'_, Postgres>,
    table: &str,
    viewer: Option<Id>,
    member: bool,
) {
    query.push(if member { " AND " } else { " AND NOT " });
    query.push(format!(
        "EXISTS(SELECT 1 FROM {table} m WHERE m.recipe_id = r.id AND m.user_id = "
    ));
    query.push_bind(viewer);
    query.push(")");
}

fn push_recipe_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter, viewer: Option<Id>) {
    if !filter.tags.is_empty() {
        let slugs: Vec<String> = filter.tags.iter().map(|slug| slug.to_lowercase()).collect();
        query.push(
            " AND EXISTS(SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id
                WHERE rt.recipe_id = r.id AND LOWER(t.slug) = ANY(",
        );
        query.push_bind(slugs);
        query.push("))");
    }
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }
    if let Some(member) = filter.is_favorited {
        push_membership_filter(query, "favorites", viewer, member);
    }
    if let Some(member) = filter.is_in_shopping_cart {
        push_membership_filter(query, "shopping_cart", viewer, member);
    }
}

async fn count_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<i64, potion::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut query, filter, viewer);

    let count: (i64,) = query
        .build_query_as::<(i64,)>()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeDetail>, potion::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_select(&mut query, viewer);
    query.push(", COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut query, filter, viewer);

    query.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ");
    query.push_bind(page.page_size);
    query.push(" OFFSET ");
    query.push_bind(page.offset());

    let rows: Vec<RecipeRowPartial> = query
        .build_query_as::<RecipeRowPartial>()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.page > 1 => count_recipes(filter, viewer, pool).await?,
        None => 0,
    };
    let rows: Vec<RecipeRow> = rows.into_iter().map(RecipeRow::from).collect();
    let recipes = hydrate_recipes(rows, viewer, pool).await?;

    Ok(PageContext::from_rows(recipes, total_count, page))
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as(
        "SELECT id, author_id, name, text, cooking_time, image FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Fetches a recipe the session is allowed to modify: its own, or any for admins
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(PermissionError::default().into())
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(NotFoundError::new("No recipe exists with specified id").into()),
    }
}

pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, potion::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_select(&mut query, viewer);
    query.push(" FROM recipes r WHERE r.id = ");
    query.push_bind(id);

    let row: Option<RecipeRow> = query
        .build_query_as::<RecipeRow>()
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    let row = row.ok_or_else(|| NotFoundError::new("No recipe exists with specified id"))?;

    hydrate_recipes(vec![row], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| NotFoundError::new("No recipe exists with specified id").into())
}

pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, potion::Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Expands tags, ingredient lines and authors of a batch of recipes
async fn hydrate_recipes(
    rows: Vec<RecipeRow>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, potion::Error> {
    if rows.is_empty() {
        return Ok(vec![]);
    }
    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let author_ids: Vec<Id> = rows
        .iter()
        .map(|row| row.author_id)
        .collect::<HashSet<Id>>()
        .into_iter()
        .collect();

    let tags: Vec<RecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let ingredients: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let authors: Vec<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM follows f WHERE f.author_id = u.id AND f.user_id = $2) AS is_subscribed
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(&author_ids)
    .bind(viewer)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut tags_by_recipe: HashMap<Id, Vec<Tag>> = HashMap::new();
    tags.into_iter().for_each(|tag| {
        tags_by_recipe
            .entry(tag.recipe_id)
            .or_default()
            .push(tag.into())
    });

    let mut ingredients_by_recipe: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    ingredients.into_iter().for_each(|line| {
        ingredients_by_recipe
            .entry(line.recipe_id)
            .or_default()
            .push(line)
    });

    let authors: HashMap<Id, UserProfile> = authors
        .into_iter()
        .map(|author| (author.id, author))
        .collect();

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let Some(author) = authors.get(&row.author_id) else {
                log::warn!("Recipe {} points to missing author {}", row.id, row.author_id);
                return None;
            };

            Some(RecipeDetail {
                id: row.id,
                tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
                author: author.to_owned(),
                ingredients: ingredients_by_recipe.remove(&row.id).unwrap_or_default(),
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
                name: row.name,
                image: row.image,
                text: row.text,
                cooking_time: row.cooking_time,
            })
        })
        .collect())
}

async fn ensure_tags_exist(tags: &[Id], conn: &mut PgConnection) -> Result<(), potion::Error> {
    if tags.is_empty() {
        return Ok(());
    }

    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tags.to_vec())
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();

    match tags.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(NotFoundError::new(&format!("No tag exists with id {missing}")).into()),
        None => Ok(()),
    }
}

async fn ensure_ingredients_exist(
    lines: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    if lines.is_empty() {
        return Ok(());
    }

    let ids: Vec<Id> = lines.iter().map(|line| line.id).collect();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => {
            Err(NotFoundError::new(&format!("No ingredient exists with id {missing}")).into())
        }
        None => Ok(()),
    }
}

/// Replaces the whole tag set of a recipe. Expects deduplicated, existing ids.
async fn replace_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if tags.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Replaces every ingredient line of a recipe. Expects deduplicated, existing ids.
async fn replace_recipe_ingredients(
    recipe_id: Id,
    lines: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if lines.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query.push_values(lines, |mut row, line| {
        row.push_bind(recipe_id)
            .push_bind(line.id)
            .push_bind(line.amount);
    });
    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Creates a recipe together with its tags and ingredient lines.
///
/// The payload is validated before anything is written and every referenced
/// tag and ingredient is resolved inside the same transaction, so an unknown
/// id leaves no trace of the recipe behind.
pub async fn create_recipe(
    author_id: Id,
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<Id, potion::Error> {
    payload.validate()?;

    let tags = dedup_tags(&payload.tags);
    let lines = dedup_ingredients(&payload.ingredients);

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    ensure_tags_exist(&tags, &mut *tr).await?;
    ensure_ingredients_exist(&lines, &mut *tr).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(payload.name.trim())
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .bind(&payload.image)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_tags(id.0, &tags, &mut *tr).await?;
    replace_recipe_ingredients(id.0, &lines, &mut *tr).await?;

    tr.commit().await.map_err(QueryError::from)?;

    log::debug!(
        "Created recipe {} with {} tag(s) and {} ingredient(s)",
        id.0,
        tags.len(),
        lines.len()
    );

    Ok(id.0)
}

/// Updates a recipe in place.
///
/// Scalar fields that are absent keep their value. A present `tags` or
/// `ingredients` list replaces the existing set as a whole, an absent one
/// leaves it untouched. Everything happens in one transaction.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn update_recipe(id: Id, patch: &RecipePatch, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    patch.validate()?;

    let tags = patch.tags.as_deref().map(dedup_tags);
    let lines = patch.ingredients.as_deref().map(dedup_ingredients);

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    if let Some(tags) = &tags {
        ensure_tags_exist(tags, &mut *tr).await?;
    }
    if let Some(lines) = &lines {
        ensure_ingredients_exist(lines, &mut *tr).await?;
    }

    let updated = sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = CASE WHEN $5 THEN $4 ELSE image END
        WHERE id = $6
    ",
    )
    .bind(patch.name.as_deref().map(str::trim))
    .bind(&patch.text)
    .bind(patch.cooking_time)
    .bind(patch.image.clone().flatten())
    .bind(patch.image.is_some())
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if updated.rows_affected() == 0 {
        return Err(NotFoundError::new("No recipe exists with specified id").into());
    }

    if let Some(tags) = &tags {
        replace_recipe_tags(id, tags, &mut *tr).await?;
    }
    if let Some(lines) = &lines {
        replace_recipe_ingredients(id, lines, &mut *tr).await?;
    }

    tr.commit().await.map_err(QueryError::from)?;

    Ok(())
}

/// Deletes a recipe, its associations and memberships go with it.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::new("No recipe exists with specified id").into());
    }

    Ok(())
}
