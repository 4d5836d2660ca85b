use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{filters::BoxedFilter, reject::Rejection, reply::Response, Filter};

use crate::{
    actions::RecipeList,
    authentication::middleware::{with_possible_session, with_session},
    constants::MAX_BODY_SIZE,
    form::QueryData,
    schema::Id,
};

use super::{
    handlers::{self, AppState},
    reply::recover,
};

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn recipe_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let session = with_session(state.secret.clone());
    let possible_session = with_possible_session(state.secret.clone());

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(possible_session.clone())
        .and(warp::query::<QueryData>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(session.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::download_shopping_cart);

    let get = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(possible_session)
        .and(with_state(state.clone()))
        .and_then(handlers::get_recipe);

    // PUT and PATCH share partial update semantics
    let update = warp::path!("recipes" / Id)
        .and(warp::put().or(warp::patch()).unify())
        .and(session.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(session)
        .and(with_state(state.clone()))
        .and_then(handlers::delete_recipe);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(membership_routes("favorite", RecipeList::Favorites, state))
        .unify()
        .or(membership_routes("shopping_cart", RecipeList::ShoppingCart, state))
        .unify()
        .boxed()
}

/// `POST`/`DELETE /recipes/{id}/<segment>`
fn membership_routes(segment: &'static str, list: RecipeList, state: &AppState) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());
    let session = with_session(state.secret.clone());

    let add = path
        .clone()
        .and(warp::post())
        .and(warp::any().map(move || list))
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::add_to_list);

    let remove = path
        .and(warp::delete())
        .and(warp::any().map(move || list))
        .and(session)
        .and(with_state(state.clone()))
        .and_then(handlers::remove_from_list);

    add.or(remove).unify().boxed()
}

fn user_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let session = with_session(state.secret.clone());
    let possible_session = with_possible_session(state.secret.clone());

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::register);

    let list = warp::path!("users")
        .and(warp::get())
        .and(possible_session.clone())
        .and(warp::query::<QueryData>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_users);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::get_me);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(session.clone())
        .and(warp::query::<QueryData>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_subscriptions);

    let get = warp::path!("users" / Id)
        .and(warp::get())
        .and(possible_session)
        .and(with_state(state.clone()))
        .and_then(handlers::get_user);

    let delete = warp::path!("users" / Id)
        .and(warp::delete())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::delete_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(session.clone())
        .and(warp::query::<QueryData>())
        .and(with_state(state.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(session)
        .and(with_state(state.clone()))
        .and_then(handlers::unsubscribe);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::login);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(get)
        .unify()
        .or(delete)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(login)
        .unify()
        .boxed()
}

fn catalogue_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let session = with_session(state.secret.clone());

    let list_tags = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_tags);

    let get_tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_tag);

    let create_tag = warp::path!("tags")
        .and(warp::post())
        .and(session.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_tag);

    let list_ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<QueryData>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_ingredients);

    let get_ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_ingredient);

    let create_ingredient = warp::path!("ingredients")
        .and(warp::post())
        .and(session)
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_ingredient);

    list_tags
        .or(get_tag)
        .unify()
        .or(create_tag)
        .unify()
        .or(list_ingredients)
        .unify()
        .or(get_ingredient)
        .unify()
        .or(create_ingredient)
        .unify()
        .boxed()
}

/// Every endpoint, mounted under `/api`
pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let api = recipe_routes(&state)
        .or(user_routes(&state))
        .unify()
        .or(catalogue_routes(&state))
        .unify();

    warp::path("api")
        .and(api)
        .recover(recover)
        .unify()
        .boxed()
}
