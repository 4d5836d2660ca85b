use std::sync::Arc;

use serde_json::json;
use sqlx::{Pool, Postgres};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::Response,
};

use crate::{
    actions::{self, RecipeFilter, RecipeList},
    authentication::permissions::ActionType,
    constants::{
        RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME, SUBSCRIPTION_RECIPES_LIMIT,
        USER_COUNT_PER_PAGE,
    },
    error::PermissionError,
    form::{Form, QueryData},
    jwt::SessionData,
    pagination::PageRequest,
    payload::{Credentials, NewIngredient, NewTag, NewUser, RecipePatch, RecipePayload},
    schema::Id,
};

use super::reply::{attachment, error_reply, json_reply, no_content, respond};

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub secret: Arc<Vec<u8>>,
}

type HandlerResult = Result<Response, Rejection>;

fn page_request(form: &Form, default_size: i64) -> Result<PageRequest, potion::Error> {
    Ok(PageRequest::new(
        form.get_number("page")?,
        form.get_number("limit")?,
        default_size,
    ))
}

fn recipe_filter(form: &Form) -> Result<RecipeFilter, potion::Error> {
    let tags = form
        .get_str("tags")
        .map(|tags| {
            tags.split(',')
                .map(str::trim)
                .filter(|slug| !slug.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(RecipeFilter {
        tags,
        author: form.get_number("author")?,
        is_favorited: form.get_flag("is_favorited")?,
        is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
    })
}

fn viewer_id(session: &Option<SessionData>) -> Option<Id> {
    session.as_ref().map(|session| session.user_id)
}

// Recipes

pub async fn list_recipes(session: Option<SessionData>, query: QueryData, state: AppState) -> HandlerResult {
    let form = Form::from_data(query);
    let result = async {
        let filter = recipe_filter(&form)?;
        let page = page_request(&form, RECIPE_COUNT_PER_PAGE)?;
        actions::fetch_recipes(&filter, viewer_id(&session), page, &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::OK))
}

pub async fn get_recipe(id: Id, session: Option<SessionData>, state: AppState) -> HandlerResult {
    let result = actions::get_recipe_detail(id, viewer_id(&session), &state.pool).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn create_recipe(session: SessionData, payload: RecipePayload, state: AppState) -> HandlerResult {
    let result = async {
        session.authenticate(ActionType::CreateRecipes)?;
        let id = actions::create_recipe(session.user_id, &payload, &state.pool).await?;
        log::info!("{} created recipe {id}", session.username);
        actions::get_recipe_detail(id, Some(session.user_id), &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Id,
    session: SessionData,
    patch: RecipePatch,
    state: AppState,
) -> HandlerResult {
    let result = async {
        actions::get_recipe_mut(id, &session, &state.pool).await?;
        actions::update_recipe(id, &patch, &state.pool).await?;
        log::info!("{} updated recipe {id}", session.username);
        actions::get_recipe_detail(id, Some(session.user_id), &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::OK))
}

pub async fn delete_recipe(id: Id, session: SessionData, state: AppState) -> HandlerResult {
    let result = async {
        actions::get_recipe_mut(id, &session, &state.pool).await?;
        actions::delete_recipe(id, &state.pool).await?;
        log::info!("{} deleted recipe {id}", session.username);
        Ok::<(), potion::Error>(())
    }
    .await;

    Ok(no_content(result))
}

// Favorites and shopping cart

pub async fn add_to_list(id: Id, list: RecipeList, session: SessionData, state: AppState) -> HandlerResult {
    let result = async {
        session.authenticate(ActionType::ManageOwnMemberships)?;
        let (recipe, added) =
            actions::add_to_recipe_list(list, session.user_id, id, &state.pool).await?;
        if added {
            log::debug!("{} added recipe {id} to {}", session.username, list.label());
        }
        Ok::<_, potion::Error>(recipe)
    }
    .await;

    Ok(respond(result, StatusCode::CREATED))
}

pub async fn remove_from_list(id: Id, list: RecipeList, session: SessionData, state: AppState) -> HandlerResult {
    let result = async {
        session.authenticate(ActionType::ManageOwnMemberships)?;
        let removed = actions::remove_from_recipe_list(list, session.user_id, id, &state.pool).await?;
        if removed {
            log::debug!("{} removed recipe {id} from {}", session.username, list.label());
        }
        Ok::<(), potion::Error>(())
    }
    .await;

    Ok(no_content(result))
}

pub async fn download_shopping_cart(session: SessionData, state: AppState) -> HandlerResult {
    match actions::build_shopping_list(session.user_id, &state.pool).await {
        Ok(list) => Ok(attachment(list.render(), SHOPPING_LIST_FILENAME)),
        Err(e) => Ok(error_reply(e)),
    }
}

// Users and subscriptions

pub async fn register(new_user: NewUser, state: AppState) -> HandlerResult {
    let result = actions::register_user(&new_user, &state.pool).await;
    Ok(respond(result, StatusCode::CREATED))
}

pub async fn login(credentials: Credentials, state: AppState) -> HandlerResult {
    match actions::login_user(&credentials, &state.secret, &state.pool).await {
        Ok(token) => {
            log::info!("{} logged in", credentials.username);
            Ok(json_reply(&json!({ "auth_token": token }), StatusCode::OK))
        }
        Err(e) => Ok(error_reply(e)),
    }
}

pub async fn list_users(session: Option<SessionData>, query: QueryData, state: AppState) -> HandlerResult {
    let form = Form::from_data(query);
    let result = async {
        let page = page_request(&form, USER_COUNT_PER_PAGE)?;
        actions::fetch_users(viewer_id(&session), page, &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::OK))
}

pub async fn get_me(session: SessionData, state: AppState) -> HandlerResult {
    let result = actions::get_user_profile(session.user_id, Some(session.user_id), &state.pool).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn get_user(id: Id, session: Option<SessionData>, state: AppState) -> HandlerResult {
    let result = actions::get_user_profile(id, viewer_id(&session), &state.pool).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn delete_user(id: Id, session: SessionData, state: AppState) -> HandlerResult {
    let result = async {
        if id != session.user_id {
            session
                .authenticate(ActionType::ManageUsers)
                .map_err(|_| PermissionError::new("You can only delete your own account"))?;
        }
        actions::delete_user(id, &state.pool).await
    }
    .await;

    Ok(no_content(result))
}

fn recipes_limit(form: &Form) -> Result<i64, potion::Error> {
    Ok(form
        .get_number("recipes_limit")?
        .unwrap_or(SUBSCRIPTION_RECIPES_LIMIT))
}

pub async fn list_subscriptions(session: SessionData, query: QueryData, state: AppState) -> HandlerResult {
    let form = Form::from_data(query);
    let result = async {
        let limit = recipes_limit(&form)?;
        let page = page_request(&form, USER_COUNT_PER_PAGE)?;
        actions::fetch_subscriptions(session.user_id, limit, page, &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::OK))
}

pub async fn subscribe(id: Id, session: SessionData, query: QueryData, state: AppState) -> HandlerResult {
    let form = Form::from_data(query);
    let result = async {
        session.authenticate(ActionType::ManageOwnMemberships)?;
        let limit = recipes_limit(&form)?;
        if actions::subscribe(session.user_id, id, &state.pool).await? {
            log::debug!("{} subscribed to user {id}", session.username);
        }
        actions::get_subscription(session.user_id, id, limit, &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::CREATED))
}

pub async fn unsubscribe(id: Id, session: SessionData, state: AppState) -> HandlerResult {
    let result = async {
        session.authenticate(ActionType::ManageOwnMemberships)?;
        if actions::unsubscribe(session.user_id, id, &state.pool).await? {
            log::debug!("{} unsubscribed from user {id}", session.username);
        }
        Ok::<(), potion::Error>(())
    }
    .await;

    Ok(no_content(result))
}

// Catalogue

pub async fn list_tags(state: AppState) -> HandlerResult {
    Ok(respond(actions::list_tags(&state.pool).await, StatusCode::OK))
}

pub async fn get_tag(id: Id, state: AppState) -> HandlerResult {
    Ok(respond(actions::get_tag_or_404(id, &state.pool).await, StatusCode::OK))
}

pub async fn create_tag(session: SessionData, new_tag: NewTag, state: AppState) -> HandlerResult {
    let result = async {
        session.authenticate(ActionType::ManageCatalogue)?;
        actions::create_tag(&new_tag, &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::CREATED))
}

pub async fn list_ingredients(query: QueryData, state: AppState) -> HandlerResult {
    let form = Form::from_data(query);
    let result = actions::list_ingredients(form.get_str("name"), &state.pool).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn get_ingredient(id: Id, state: AppState) -> HandlerResult {
    Ok(respond(actions::get_ingredient_or_404(id, &state.pool).await, StatusCode::OK))
}

pub async fn create_ingredient(
    session: SessionData,
    ingredient: NewIngredient,
    state: AppState,
) -> HandlerResult {
    let result = async {
        session.authenticate(ActionType::ManageCatalogue)?;
        actions::create_ingredient(&ingredient, &state.pool).await
    }
    .await;

    Ok(respond(result, StatusCode::CREATED))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn reads_recipe_filter() {
        let filter = recipe_filter(&form(&[
            ("tags", "breakfast, Lunch,,"),
            ("author", "3"),
            ("is_favorited", "1"),
        ]))
        .ok()
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "Lunch"]);
        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.is_favorited, Some(true));
        assert_eq!(filter.is_in_shopping_cart, None);
    }

    #[test]
    fn rejects_invalid_filter_values() {
        assert!(recipe_filter(&form(&[("author", "me")])).is_err());
        assert!(recipe_filter(&form(&[("is_in_shopping_cart", "yes")])).is_err());
    }

    #[test]
    fn page_defaults() {
        let page = page_request(&form(&[]), RECIPE_COUNT_PER_PAGE).ok().unwrap();
        assert_eq!(page, PageRequest::new(None, None, RECIPE_COUNT_PER_PAGE));
        assert_eq!(recipes_limit(&form(&[])).ok(), Some(SUBSCRIPTION_RECIPES_LIMIT));
    }
}
