/// User ↔ Role join relation
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_roles (
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE RESTRICT,
///     PRIMARY KEY (user_id, role_id)
/// );
/// ```
///
/// A user's role set is only ever replaced as a whole
/// ([`UserRole::replace_for_user`]).

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A single user-role link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub user_id: i64,
    pub role_id: i64,
}

impl UserRole {
    /// Lists the role IDs linked to a user
    pub async fn role_ids_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT role_id FROM user_roles WHERE user_id = $1 ORDER BY role_id ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Replaces the role set of a user
    ///
    /// Deletes every existing link and inserts the new ones inside a single
    /// transaction, so a failure midway leaves the previous set intact.
    pub async fn replace_for_user(
        pool: &PgPool,
        user_id: i64,
        role_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !role_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, role_id FROM UNNEST($2::BIGINT[]) AS t(role_id)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(role_ids.to_vec())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
