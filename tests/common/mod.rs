#![allow(dead_code)]

use recipe_share::{
    actions,
    payload::{IngredientAmount, NewIngredient, NewTag, NewUser, RecipePayload},
    schema::{Id, Ingredient, Tag, UserProfile},
};
use sqlx::PgPool;

pub fn ok<T>(result: Result<T, potion::Error>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("request failed with {}: {}", e.code, e.info.unwrap_or_default()),
    }
}

pub fn error_code<T>(result: Result<T, potion::Error>) -> u16 {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(e) => e.code as u16,
    }
}

pub async fn user(pool: &PgPool, username: &str) -> UserProfile {
    let new_user = NewUser {
        email: format!("{username}@example.com"),
        username: username.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("User"),
        password: String::from("correct horse battery"),
    };
    ok(actions::register_user(&new_user, pool).await)
}

pub async fn tag(pool: &PgPool, name: &str, slug: &str, color: &str) -> Tag {
    let new_tag = NewTag {
        name: name.to_string(),
        color: color.to_string(),
        slug: slug.to_string(),
    };
    ok(actions::create_tag(&new_tag, pool).await)
}

pub async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Ingredient {
    let ingredient = NewIngredient {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    };
    ok(actions::create_ingredient(&ingredient, pool).await)
}

pub fn amounts(lines: &[(Id, i32)]) -> Vec<IngredientAmount> {
    lines
        .iter()
        .map(|(id, amount)| IngredientAmount {
            id: *id,
            amount: *amount,
        })
        .collect()
}

pub fn recipe(name: &str, tags: Vec<Id>, ingredients: &[(Id, i32)]) -> RecipePayload {
    RecipePayload {
        name: name.to_string(),
        text: format!("How to make {name}"),
        cooking_time: 20,
        image: None,
        tags,
        ingredients: amounts(ingredients),
    }
}

pub async fn recipe_count(pool: &PgPool) -> i64 {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await
        .unwrap();
    count.0
}
