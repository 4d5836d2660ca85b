use std::fmt::{self, Display};

use potion::{Error, HtmlError};
use serde_json::{Map, Value};

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        let info = match value {
            sqlx::Error::RowNotFound => String::from("RowNotFound"),
            sqlx::Error::PoolTimedOut => String::from("Pool timed out"),
            sqlx::Error::PoolClosed => String::from("Pool closed"),
            sqlx::Error::WorkerCrashed => String::from("Worker crashed"),
            sqlx::Error::ColumnDecode { index, source } => {
                format!("Column decode {index} ({source})")
            }
            e => format!("{e}"),
        };
        log::error!("> Query failed: {info}");

        Self::new(info)
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// True when the store rejected a write because of a UNIQUE constraint
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// Field-level rejection of a request payload.
///
/// Rendered as `{"<field>": ["<message>"]}` with status 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub info: String,
}

impl ValidationError {
    pub fn new(field: &str, info: &str) -> Self {
        Self {
            field: field.to_string(),
            info: info.to_string(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.info)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        let mut body = Map::new();
        body.insert(value.field, Value::Array(vec![Value::String(value.info)]));

        Error {
            code: 400,
            info: Some(Value::Object(body).to_string()),
            redirect: None,
        }
    }
}

#[derive(Debug)]
pub struct NotFoundError {
    info: String,
}

impl NotFoundError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<NotFoundError> for Error {
    fn from(value: NotFoundError) -> Self {
        Error {
            code: 404,
            info: Some(value.info),
            redirect: None,
        }
    }
}

#[derive(Debug)]
pub struct PermissionError {
    info: String,
}

impl PermissionError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Default for PermissionError {
    fn default() -> Self {
        Self::new("You don't have permission to perform this action")
    }
}

impl From<PermissionError> for Error {
    fn from(value: PermissionError) -> Self {
        Error {
            code: 403,
            info: Some(value.info),
            redirect: None,
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_renders_field_message() {
        let error: Error = ValidationError::new("cooking_time", "Ensure this value is at least 1").into();

        assert_eq!(error.code, 400);
        let body: serde_json::Value = serde_json::from_str(&error.info.unwrap_or_default()).unwrap();
        assert_eq!(body["cooking_time"][0], "Ensure this value is at least 1");
    }

    #[test]
    fn not_found_and_permission_map_to_client_errors() {
        let error: Error = NotFoundError::new("No tag exists with specified id").into();
        assert_eq!(error.code, 404);

        let error: Error = PermissionError::default().into();
        assert_eq!(error.code, 403);
    }
}
