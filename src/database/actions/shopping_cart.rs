use crate::{
    error::QueryError,
    schema::{CartLine, Id},
    shopping_list::ShoppingList,
};

use sqlx::{Pool, Postgres};

/// Every ingredient line of every recipe in the user's cart, in the order the
/// recipes were added and the lines were written
pub async fn list_cart_lines(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartLine>, potion::Error> {
    let rows: Vec<CartLine> = sqlx::query_as(
        "
        SELECT ri.ingredient_id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        ORDER BY sc.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn build_shopping_list(user_id: Id, pool: &Pool<Postgres>) -> Result<ShoppingList, potion::Error> {
    let lines = list_cart_lines(user_id, pool).await?;
    let list: ShoppingList = lines.iter().collect();

    log::debug!(
        "Shopping list of user {user_id}: {} line(s) -> {} ingredient(s)",
        lines.len(),
        list.len()
    );

    Ok(list)
}
