mod common;

use common::*;
use recipe_share::{
    actions::{self, RecipeList},
    pagination::PageRequest,
    PLACEHOLDER_AUTHOR_EMAIL, PLACEHOLDER_AUTHOR_USERNAME, USER_COUNT_PER_PAGE,
};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cart_sums_ingredients_in_order(pool: PgPool) {
    let cook = user(&pool, "alice").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let salt = ingredient(&pool, "salt", "g").await;
    let egg = ingredient(&pool, "egg", "pcs").await;

    let bread = ok(actions::create_recipe(
        cook.id,
        &recipe("Bread", vec![], &[(flour.id, 200), (salt.id, 5)]),
        &pool,
    )
    .await);
    let pancakes = ok(actions::create_recipe(
        cook.id,
        &recipe("Pancakes", vec![], &[(flour.id, 100), (egg.id, 2)]),
        &pool,
    )
    .await);

    ok(actions::add_to_recipe_list(RecipeList::ShoppingCart, cook.id, bread, &pool).await);
    ok(actions::add_to_recipe_list(RecipeList::ShoppingCart, cook.id, pancakes, &pool).await);

    let list = ok(actions::build_shopping_list(cook.id, &pool).await);
    assert_eq!(list.lines(), vec!["Flour - 300 g", "Salt - 5 g", "Egg - 2 pcs"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn empty_cart_renders_nothing(pool: PgPool) {
    let cook = user(&pool, "alice").await;

    let list = ok(actions::build_shopping_list(cook.id, &pool).await);
    assert!(list.is_empty());
    assert_eq!(list.render(), "");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn favorites_toggle_idempotently(pool: PgPool) {
    let cook = user(&pool, "alice").await;
    let id = ok(actions::create_recipe(cook.id, &recipe("Bread", vec![], &[]), &pool).await);

    let (short, added) = ok(actions::add_to_recipe_list(RecipeList::Favorites, cook.id, id, &pool).await);
    assert!(added);
    assert_eq!(short.name, "Bread");

    let (_, added) = ok(actions::add_to_recipe_list(RecipeList::Favorites, cook.id, id, &pool).await);
    assert!(!added);
    assert!(ok(actions::is_in_recipe_list(RecipeList::Favorites, cook.id, id, &pool).await));

    assert!(ok(actions::remove_from_recipe_list(RecipeList::Favorites, cook.id, id, &pool).await));
    // already gone
    assert!(!ok(actions::remove_from_recipe_list(RecipeList::Favorites, cook.id, id, &pool).await));
    assert!(!ok(actions::is_in_recipe_list(RecipeList::Favorites, cook.id, id, &pool).await));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn memberships_need_an_existing_recipe(pool: PgPool) {
    let cook = user(&pool, "alice").await;

    let added = actions::add_to_recipe_list(RecipeList::ShoppingCart, cook.id, 4242, &pool).await;
    assert_eq!(error_code(added), 404);
    let removed = actions::remove_from_recipe_list(RecipeList::ShoppingCart, cook.id, 4242, &pool).await;
    assert_eq!(error_code(removed), 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn subscriptions_preview_newest_recipes(pool: PgPool) {
    let reader = user(&pool, "bob").await;
    let author = user(&pool, "alice").await;

    for name in ["Bread", "Stew", "Porridge"] {
        ok(actions::create_recipe(author.id, &recipe(name, vec![], &[]), &pool).await);
    }

    assert!(ok(actions::subscribe(reader.id, author.id, &pool).await));
    assert!(!ok(actions::subscribe(reader.id, author.id, &pool).await));
    assert_eq!(error_code(actions::subscribe(reader.id, reader.id, &pool).await), 400);

    let page = PageRequest::new(None, None, USER_COUNT_PER_PAGE);
    let subscriptions = ok(actions::fetch_subscriptions(reader.id, 2, page, &pool).await);

    assert_eq!(subscriptions.count, 1);
    let subscription = &subscriptions.results[0];
    assert_eq!(subscription.author.username, "alice");
    assert!(subscription.author.is_subscribed);
    assert_eq!(subscription.recipes_count, 3);
    let names: Vec<_> = subscription.recipes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Porridge", "Stew"]);

    assert!(ok(actions::unsubscribe(reader.id, author.id, &pool).await));
    assert!(!ok(actions::unsubscribe(reader.id, author.id, &pool).await));
    assert!(!ok(actions::is_subscribed(reader.id, author.id, &pool).await));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleted_users_hand_over_recipes(pool: PgPool) {
    let author = user(&pool, "alice").await;
    let reader = user(&pool, "bob").await;
    let id = ok(actions::create_recipe(author.id, &recipe("Bread", vec![], &[]), &pool).await);
    ok(actions::add_to_recipe_list(RecipeList::Favorites, author.id, id, &pool).await);
    ok(actions::subscribe(reader.id, author.id, &pool).await);

    ok(actions::delete_user(author.id, &pool).await);

    let detail = ok(actions::get_recipe_detail(id, None, &pool).await);
    assert_eq!(detail.author.username, PLACEHOLDER_AUTHOR_USERNAME);
    assert_eq!(error_code(actions::get_user_profile(author.id, None, &pool).await), 404);
    assert_eq!(error_code(actions::delete_user(author.id, &pool).await), 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn placeholder_author_cannot_be_claimed(pool: PgPool) {
    let squatter = recipe_share::payload::NewUser {
        email: String::from("squatter@example.com"),
        username: String::from(PLACEHOLDER_AUTHOR_USERNAME),
        first_name: String::from("Not"),
        last_name: String::from("Deleted"),
        password: String::from("correct horse battery"),
    };
    assert_eq!(error_code(actions::register_user(&squatter, &pool).await), 400);

    let squatter = recipe_share::payload::NewUser {
        email: String::from(PLACEHOLDER_AUTHOR_EMAIL),
        username: String::from("squatter"),
        ..squatter
    };
    assert_eq!(error_code(actions::register_user(&squatter, &pool).await), 400);

    // a look-alike name is an ordinary account and must not inherit anything
    let lookalike = user(&pool, "Deleted_").await;
    let author = user(&pool, "alice").await;
    let id = ok(actions::create_recipe(author.id, &recipe("Bread", vec![], &[]), &pool).await);

    ok(actions::delete_user(author.id, &pool).await);

    let detail = ok(actions::get_recipe_detail(id, None, &pool).await);
    assert_ne!(detail.author.id, lookalike.id);
    let placeholder: (bool,) = sqlx::query_as("SELECT is_placeholder FROM users WHERE id = $1")
        .bind(detail.author.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(placeholder.0);

    assert_eq!(error_code(actions::delete_user(detail.author.id, &pool).await), 400);
    ok(actions::delete_user(lookalike.id, &pool).await);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn placeholder_is_not_listed(pool: PgPool) {
    let alice = user(&pool, "alice").await;

    let page = PageRequest::new(None, None, USER_COUNT_PER_PAGE);
    let users = ok(actions::fetch_users(None, page, &pool).await);

    assert_eq!(users.count, 1);
    assert_eq!(users.results[0].id, alice.id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_usernames_are_rejected(pool: PgPool) {
    user(&pool, "alice").await;

    let new_user = recipe_share::payload::NewUser {
        email: String::from("other@example.com"),
        username: String::from("alice"),
        first_name: String::from("Other"),
        last_name: String::from("Alice"),
        password: String::from("correct horse battery"),
    };
    assert_eq!(error_code(actions::register_user(&new_user, &pool).await), 400);
}
