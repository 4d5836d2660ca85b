use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    constants::PLACEHOLDER_AUTHOR_USERNAME,
    error::{is_unique_violation, NotFoundError, QueryError, ValidationError},
    pagination::{PageContext, PageRequest},
    payload::{Credentials, NewUser},
    schema::{Id, User, UserProfile, UserProfileRow},
};

use potion::HtmlError;
use sqlx::{PgConnection, Pool, Postgres};

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user, storing an argon2 hash of their password
pub async fn register_user(new_user: &NewUser, pool: &Pool<Postgres>) -> Result<UserProfile, potion::Error> {
    new_user.validate()?;

    let password = hash_password(&new_user.password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    let profile: UserProfile = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, username, first_name, last_name, FALSE AS is_subscribed
    ",
    )
    .bind(new_user.email.trim())
    .bind(new_user.username.trim())
    .bind(new_user.first_name.trim())
    .bind(new_user.last_name.trim())
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(|e| -> potion::Error {
        if is_unique_violation(&e) {
            let field = match e.as_database_error().and_then(|e| e.constraint()) {
                Some("unique_email") => "email",
                _ => "username",
            };
            return ValidationError::new(field, &format!("A user with that {field} already exists")).into();
        }
        QueryError::from(e).into()
    })?;

    log::info!("Registered user {} ({})", profile.username, profile.id);

    Ok(profile)
}

/// Checks the credentials and issues a session token
pub async fn login_user(
    credentials: &Credentials,
    secret: &[u8],
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let user = get_user(pool, &credentials.username)
        .await?
        .filter(|user| verify_password(&credentials.password, &user.password))
        .ok_or_else(|| HtmlError::InvalidRequest.new("Invalid credentials"))?;

    generate_jwt_session(&user, secret)
}

pub async fn get_user_profile(
    user_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, potion::Error> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM follows f WHERE f.author_id = u.id AND f.user_id = $2) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| NotFoundError::new("No user exists with specified id").into())
}

async fn count_users(pool: &Pool<Postgres>) -> Result<i64, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE NOT is_placeholder")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn fetch_users(
    viewer: Option<Id>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, potion::Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM follows f WHERE f.author_id = u.id AND f.user_id = $1) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        WHERE NOT u.is_placeholder
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(page.page_size)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.page > 1 => count_users(pool).await?,
        None => 0,
    };
    let rows = rows.into_iter().map(UserProfile::from).collect();

    Ok(PageContext::from_rows(rows, total_count, page))
}

/// The seeded account that inherits recipes of deleted users
async fn placeholder_author(conn: &mut PgConnection) -> Result<Id, potion::Error> {
    let id: Option<(Id,)> = sqlx::query_as("SELECT id FROM users WHERE is_placeholder")
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    id.map(|id| id.0)
        .ok_or_else(|| HtmlError::InternalServerError.new("Placeholder author is missing"))
}

/// Deletes a user. Their recipes are handed over to the placeholder author,
/// their favorites, cart and follows go with them.
/// ATTENTION: DOES NOT CHECK FOR PERMISSIONS BY ITSELF
pub async fn delete_user(user_id: Id, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let placeholder = placeholder_author(&mut *tr).await?;
    if placeholder == user_id {
        return Err(ValidationError::new("user", "The placeholder author can't be deleted").into());
    }

    let reassigned = sqlx::query("UPDATE recipes SET author_id = $1 WHERE author_id = $2")
        .bind(placeholder)
        .bind(user_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    if deleted.rows_affected() == 0 {
        return Err(NotFoundError::new("No user exists with specified id").into());
    }

    tr.commit().await.map_err(QueryError::from)?;

    log::info!(
        "Deleted user {user_id}, {} recipe(s) reassigned to {PLACEHOLDER_AUTHOR_USERNAME}",
        reassigned.rows_affected()
    );

    Ok(())
}
