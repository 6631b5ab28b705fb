/// Role model and database operations
///
/// A role groups menu permissions (via `role_menus`) and is granted to users
/// (via `user_roles`). Both `name` and `code` are unique across roles.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL UNIQUE,
///     code VARCHAR(100) NOT NULL UNIQUE,
///     remark VARCHAR(500),
///     create_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     update_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Superuser
///
/// One role is designated as the superuser role (by name, see
/// [`SUPERUSER_ROLE_NAME`]). It can never be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Default name of the designated superuser role
pub const SUPERUSER_ROLE_NAME: &str = "超级管理员";

/// Permission code given to the superuser role by bootstrap
pub const SUPERUSER_ROLE_CODE: &str = "admin";

/// Role model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    /// Unique role ID
    pub id: i64,

    /// Display name, unique
    pub name: String,

    /// Permission string identifier, unique
    pub code: String,

    pub remark: Option<String>,

    pub create_time: DateTime<Utc>,

    pub update_time: DateTime<Utc>,
}

/// Input for creating or updating a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInput {
    pub name: String,
    pub code: String,
    pub remark: Option<String>,
}

impl Role {
    /// Creates a new role
    ///
    /// # Errors
    ///
    /// Returns an error if the name or code is already used, or if the
    /// database connection fails
    pub async fn create(pool: &PgPool, data: RoleInput) -> Result<Self, sqlx::Error> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, code, remark)
            VALUES ($1, $2, $3)
            RETURNING id, name, code, remark, create_time, update_time
            "#,
        )
        .bind(data.name)
        .bind(data.code)
        .bind(data.remark)
        .fetch_one(pool)
        .await?;

        Ok(role)
    }

    /// Updates name, code and remark of a role
    ///
    /// # Returns
    ///
    /// The updated role if found, None if role doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: RoleInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $2, code = $3, remark = $4, update_time = NOW()
            WHERE id = $1
            RETURNING id, name, code, remark, create_time, update_time
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.code)
        .bind(data.remark)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Finds a role by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, code, remark, create_time, update_time
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Fetches all roles whose ID is in `ids`, in a single query
    pub async fn find_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, code, remark, create_time, update_time
            FROM roles
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(pool)
        .await?;

        Ok(roles)
    }

    /// Finds a role by its display name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, code, remark, create_time, update_time
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Lists every role, ordered by ID
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, code, remark, create_time, update_time
            FROM roles
            ORDER BY id ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(roles)
    }

    /// Lists roles whose name contains `query` (case-insensitive)
    pub async fn search(
        pool: &PgPool,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, code, remark, create_time, update_time
            FROM roles
            WHERE $1 = '' OR name ILIKE '%' || $1 || '%'
            ORDER BY id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(roles)
    }

    /// Counts roles matching a search query
    pub async fn count_matching(pool: &PgPool, query: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM roles WHERE $1 = '' OR name ILIKE '%' || $1 || '%'",
        )
        .bind(query)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Checks whether a name is used by any role other than `exclude`
    pub async fn name_exists(
        pool: &PgPool,
        name: &str,
        exclude: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Checks whether a code is used by any role other than `exclude`
    pub async fn code_exists(
        pool: &PgPool,
        code: &str,
        exclude: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE code = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Returns the subset of `ids` that refer to existing roles
    pub async fn existing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(pool)
            .await?;

        Ok(found)
    }

    /// Deletes a role after removing its user and menu links
    ///
    /// Join tables reference roles with `ON DELETE RESTRICT`; the three
    /// statements share one transaction so a failure leaves everything as it
    /// was.
    ///
    /// # Returns
    ///
    /// True if the role was deleted, false if it didn't exist
    pub async fn delete_with_links(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superuser_constants() {
        assert_eq!(SUPERUSER_ROLE_NAME, "超级管理员");
        assert_eq!(SUPERUSER_ROLE_CODE, "admin");
    }

    #[test]
    fn test_role_serialization_shape() {
        let role = Role {
            id: 3,
            name: "Auditor".to_string(),
            code: "auditor".to_string(),
            remark: None,
            create_time: Utc::now(),
            update_time: Utc::now(),
        };

        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["code"], "auditor");
        assert!(json["remark"].is_null());
    }
}
