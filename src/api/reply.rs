use std::convert::Infallible;

use serde::Serialize;
use serde_json::{json, Value};
use warp::{
    filters::body::BodyDeserializeError,
    http::{header, HeaderValue, StatusCode},
    reject::{InvalidQuery, MethodNotAllowed, Rejection},
    reply::{self, Reply, Response},
};

use crate::{authentication::middleware::Unauthorized, error::TypeError};

fn detail(status: StatusCode, info: &str) -> Response {
    reply::with_status(reply::json(&json!({ "detail": info })), status).into_response()
}

/// Renders an error as JSON. Validation errors already carry a JSON object
/// in `info` and are passed through as-is.
pub fn error_reply(e: potion::Error) -> Response {
    let status = StatusCode::from_u16(e.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let info = e.info.unwrap_or_default();

    if status.is_server_error() {
        log::error!("> {status}: {info}");
        // store details stay in the log
        return detail(status, "Internal server error");
    }

    match serde_json::from_str::<Value>(&info) {
        Ok(body @ Value::Object(_)) => reply::with_status(reply::json(&body), status).into_response(),
        _ => detail(status, &info),
    }
}

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn respond<T: Serialize>(result: Result<T, potion::Error>, status: StatusCode) -> Response {
    match result {
        Ok(value) => json_reply(&value, status),
        Err(e) => error_reply(e),
    }
}

pub fn no_content(result: Result<(), potion::Error>) -> Response {
    match result {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_reply(e),
    }
}

/// Plain text download, served as an attachment
pub fn attachment(body: String, filename: &str) -> Response {
    let mut response = reply::with_header(body, header::CONTENT_TYPE, "text/plain; charset=utf-8").into_response();

    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Turns rejections that escaped the routes into JSON errors
pub async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    if rejection.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, "Not found"));
    }
    if rejection.find::<Unauthorized>().is_some() {
        return Ok(detail(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided or are invalid",
        ));
    }
    if let Some(e) = rejection.find::<BodyDeserializeError>() {
        return Ok(error_reply(TypeError::new(&format!("{e}")).into()));
    }
    if rejection.find::<InvalidQuery>().is_some() {
        return Ok(detail(StatusCode::BAD_REQUEST, "Invalid query string"));
    }
    if rejection.find::<MethodNotAllowed>().is_some() {
        return Ok(detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    log::error!("> Unhandled rejection: {rejection:?}");
    Ok(detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotFoundError, PermissionError, ValidationError};

    #[test]
    fn validation_errors_keep_field_body() {
        let response = error_reply(ValidationError::new("cooking_time", "Ensure this value is at least 1").into());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn maps_error_codes_to_status() {
        assert_eq!(error_reply(NotFoundError::new("missing").into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(error_reply(PermissionError::default().into()).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn attachment_has_disposition() {
        let response = attachment(String::from("Flour - 300 g\n"), "shopping_list.txt");

        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"shopping_list.txt\""
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn unauthorized_rejection_is_401() {
        let response = recover(warp::reject::custom(Unauthorized)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let response = recover(warp::reject::not_found()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
