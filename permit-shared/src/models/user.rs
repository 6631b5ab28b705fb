/// User model and database operations
///
/// This module provides the User model and CRUD operations for administrator
/// accounts. Users receive permissions only through the roles linked to them
/// in the `user_roles` table.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_status AS ENUM ('enabled', 'disabled');
///
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(100) NOT NULL UNIQUE,
///     credential VARCHAR(255) NOT NULL,
///     status user_status NOT NULL DEFAULT 'enabled',
///     email VARCHAR(100),
///     phone VARCHAR(20),
///     avatar VARCHAR(255),
///     remark VARCHAR(500),
///     last_login_at TIMESTAMPTZ,
///     create_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     update_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use permit_shared::models::user::{User, CreateUser, UserStatus};
/// use permit_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "operator".to_string(),
///     credential: "$argon2id$...".to_string(),
///     status: UserStatus::Enabled,
///     profile: Default::default(),
/// }).await?;
///
/// let found = User::find_by_username(&pool, "operator").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Account may log in
    Enabled,

    /// Account is locked out
    Disabled,
}

impl UserStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Enabled => "enabled",
            UserStatus::Disabled => "disabled",
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, UserStatus::Enabled)
    }
}

/// User model representing an administrator account
///
/// The `credential` column holds an Argon2id PHC string. Rows imported from
/// the legacy system may still hold a cleartext value until the owner logs in
/// once. It is never serialized and is redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Login name, unique across all users
    pub username: String,

    /// Stored credential (hash, or legacy cleartext awaiting migration)
    #[serde(skip_serializing, default)]
    pub credential: String,

    /// Whether the account may log in
    pub status: UserStatus,

    pub email: Option<String>,

    pub phone: Option<String>,

    /// Avatar image path (served from the media directory)
    pub avatar: Option<String>,

    pub remark: Option<String>,

    /// When the user last logged in (None if never logged in)
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub create_time: DateTime<Utc>,

    /// When the account was last updated
    pub update_time: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("credential", &"<redacted>")
            .field("status", &self.status)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("avatar", &self.avatar)
            .field("remark", &self.remark)
            .field("last_login_at", &self.last_login_at)
            .field("create_time", &self.create_time)
            .field("update_time", &self.update_time)
            .finish()
    }
}

/// Editable profile fields of a user
///
/// Saved wholesale: a `None` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub remark: Option<String>,
}

/// Input for creating a new user
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name
    pub username: String,

    /// Argon2id hash (NOT a plaintext password!)
    pub credential: String,

    /// Initial account status
    pub status: UserStatus,

    /// Profile fields
    pub profile: UserProfile,
}

impl fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUser")
            .field("username", &self.username)
            .field("credential", &"<redacted>")
            .field("status", &self.status)
            .field("profile", &self.profile)
            .finish()
    }
}

const USER_COLUMNS: &str = "id, username, credential, status, email, phone, avatar, remark, \
                            last_login_at, create_time, update_time";

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, credential, status, email, phone, avatar, remark)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.credential)
            .bind(data.status)
            .bind(data.profile.email)
            .bind(data.profile.phone)
            .bind(data.profile.avatar)
            .bind(data.profile.remark)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by login name (exact match)
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Checks whether a username is taken by any user other than `exclude`
    pub async fn username_exists(
        pool: &PgPool,
        username: &str,
        exclude: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE username = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Replaces the profile fields of a user
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn update_profile(
        pool: &PgPool,
        id: i64,
        profile: UserProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET email = $2, phone = $3, avatar = $4, remark = $5, update_time = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(profile.email)
            .bind(profile.phone)
            .bind(profile.avatar)
            .bind(profile.remark)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Stores a new credential for a user
    ///
    /// # Returns
    ///
    /// True if user was found and updated, false otherwise
    pub async fn set_credential(
        pool: &PgPool,
        id: i64,
        credential: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET credential = $2, update_time = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(credential)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Enables or disables a user account
    pub async fn set_status(
        pool: &PgPool,
        id: i64,
        status: UserStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users SET status = $2, update_time = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Updates the last login timestamp for a user
    ///
    /// This is called after successful authentication.
    pub async fn update_last_login(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users whose username contains `query` (case-insensitive)
    ///
    /// An empty query matches every user. Results are ordered by ID so that
    /// pagination is stable.
    pub async fn search(
        pool: &PgPool,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE $1 = '' OR username ILIKE '%' || $1 || '%'
            ORDER BY id ASC
            LIMIT $2 OFFSET $3
            "#
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    /// Counts users matching a search query
    pub async fn count_matching(pool: &PgPool, query: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE $1 = '' OR username ILIKE '%' || $1 || '%'",
        )
        .bind(query)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Deletes a user together with its role links
    ///
    /// The `user_roles` foreign key is `ON DELETE RESTRICT`, so the links are
    /// removed first. Both statements run in one transaction.
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete_with_links(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
