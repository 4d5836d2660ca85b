use crate::{
    error::{is_unique_violation, NotFoundError, QueryError, ValidationError},
    payload::NewTag,
    schema::{Id, Tag},
};

use sqlx::{Pool, Postgres};

pub async fn create_tag(new_tag: &NewTag, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    for (field, value) in [("name", &new_tag.name), ("color", &new_tag.color), ("slug", &new_tag.slug)] {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, "This field may not be blank").into());
        }
    }

    let tag: Tag = sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
        .bind(new_tag.name.trim())
        .bind(new_tag.color.trim())
        .bind(new_tag.slug.trim())
        .fetch_one(pool)
        .await
        .map_err(|e| -> potion::Error {
            if is_unique_violation(&e) {
                let constraint = e
                    .as_database_error()
                    .and_then(|e| e.constraint())
                    .unwrap_or_default();
                let field = ["color", "slug"]
                    .into_iter()
                    .find(|field| constraint.contains(field))
                    .unwrap_or("name");
                return ValidationError::new(field, &format!("A tag with that {field} already exists")).into();
            }
            QueryError::from(e).into()
        })?;

    Ok(tag)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn get_tag_or_404(id: Id, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    get_tag(id, pool)
        .await?
        .ok_or_else(|| NotFoundError::new("No tag exists with specified id").into())
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}
