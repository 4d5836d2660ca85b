use std::path::Path;

use crate::{
    error::{NotFoundError, QueryError, TypeError, ValidationError},
    payload::NewIngredient,
    schema::{Id, Ingredient},
};

use potion::HtmlError;
use sqlx::{Pool, Postgres, QueryBuilder};

// Keeps a single INSERT well below the bind parameter limit of postgres
const IMPORT_CHUNK_SIZE: usize = 1000;

fn validate_ingredient(ingredient: &NewIngredient) -> Result<(), ValidationError> {
    if ingredient.name.trim().is_empty() {
        return Err(ValidationError::new("name", "This field may not be blank"));
    }
    if ingredient.measurement_unit.trim().is_empty() {
        return Err(ValidationError::new("measurement_unit", "This field may not be blank"));
    }
    Ok(())
}

pub async fn create_ingredient(
    ingredient: &NewIngredient,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    validate_ingredient(ingredient)?;

    let row: Ingredient =
        sqlx::query_as("INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *")
            .bind(ingredient.name.trim())
            .bind(ingredient.measurement_unit.trim())
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_ingredient_or_404(id: Id, pool: &Pool<Postgres>) -> Result<Ingredient, potion::Error> {
    get_ingredient(id, pool)
        .await?
        .ok_or_else(|| NotFoundError::new("No ingredient exists with specified id").into())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Lists ingredients by name, optionally only those whose name starts with `search`
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE LOWER(name) LIKE LOWER($1) ORDER BY name, id")
                .bind(format!("{}%", escape_like(search)))
                .fetch_all(pool)
                .await
                .map_err(QueryError::from)?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

/// Inserts every ingredient in one transaction; nothing is inserted if any entry is invalid
pub async fn import_ingredients(
    ingredients: &[NewIngredient],
    pool: &Pool<Postgres>,
) -> Result<u64, potion::Error> {
    for ingredient in ingredients {
        validate_ingredient(ingredient)?;
    }

    let mut tr = pool.begin().await.map_err(QueryError::from)?;
    let mut inserted = 0;

    for chunk in ingredients.chunks(IMPORT_CHUNK_SIZE) {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
        query.push_values(chunk, |mut row, ingredient| {
            row.push_bind(ingredient.name.trim())
                .push_bind(ingredient.measurement_unit.trim());
        });

        let result = query
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
        inserted += result.rows_affected();
    }

    tr.commit().await.map_err(QueryError::from)?;

    log::info!("Imported {inserted} ingredient(s)");

    Ok(inserted)
}

pub async fn read_ingredients_file(path: &Path) -> Result<Vec<NewIngredient>, potion::Error> {
    let data = tokio::fs::read_to_string(path).await.map_err(|e| {
        HtmlError::InternalServerError.new(&format!("Failed to read {}: {e}", path.display()))
    })?;

    parse_ingredients(&data).map_err(potion::Error::from)
}

pub fn parse_ingredients(data: &str) -> Result<Vec<NewIngredient>, TypeError> {
    serde_json::from_str(data).map_err(|e| TypeError::new(&format!("Invalid ingredient file: {e}")))
}
