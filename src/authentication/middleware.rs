use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::constants::AUTH_TOKEN_PREFIX;

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Extracts the token from `Authorization: Token <jwt>`. `Bearer` is accepted too.
pub fn parse_authorization(header: &str) -> Option<&str> {
    header
        .strip_prefix(AUTH_TOKEN_PREFIX)
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn session_from_header(header: Option<String>, secret: &[u8]) -> Option<SessionData> {
    header
        .as_deref()
        .and_then(parse_authorization)
        .and_then(|token| verify_jwt_session(token, secret).ok())
        .map(SessionData::from)
}

pub fn with_session(
    secret: Arc<Vec<u8>>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            session_from_header(header, &secret).ok_or_else(|| warp::reject::custom(Unauthorized))
        }
    })
}

pub fn with_possible_session(
    secret: Arc<Vec<u8>>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .map(move |header: Option<String>| session_from_header(header, &secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_token_and_bearer_schemes() {
        assert_eq!(parse_authorization("Token abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("Bearer abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("Basic Zm9vOmJhcg=="), None);
        assert_eq!(parse_authorization("Token "), None);
    }
}
