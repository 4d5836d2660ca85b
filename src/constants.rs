pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Recipes embedded per followed author when `recipes_limit` is not given
pub const SUBSCRIPTION_RECIPES_LIMIT: i64 = 5;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const PASSWORD_MIN_LENGTH: usize = 8;

// Recipes of deleted users are handed over to this account
pub const PLACEHOLDER_AUTHOR_USERNAME: &str = "deleted";
pub const PLACEHOLDER_AUTHOR_EMAIL: &str = "deleted@localhost";

pub const SESSION_LIFETIME_HOURS: i64 = 24;
pub const AUTH_TOKEN_PREFIX: &str = "Token ";

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

// Largest accepted JSON request body, in bytes
pub const MAX_BODY_SIZE: u64 = 1024 * 1024;
