/// Role ↔ Menu join relation
///
/// # Schema
///
/// ```sql
/// CREATE TABLE role_menus (
///     role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE RESTRICT,
///     menu_id BIGINT NOT NULL REFERENCES menus(id) ON DELETE RESTRICT,
///     PRIMARY KEY (role_id, menu_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A single role-menu link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleMenu {
    pub role_id: i64,
    pub menu_id: i64,
}

impl RoleMenu {
    /// Lists the menu IDs granted to a single role
    pub async fn menu_ids_for_role(pool: &PgPool, role_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT menu_id FROM role_menus WHERE role_id = $1 ORDER BY menu_id ASC",
        )
        .bind(role_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Lists the menu IDs granted to any of `role_ids`, one row per link
    ///
    /// Duplicates are returned as-is; the resolver unions them.
    pub async fn menu_ids_for_roles(
        pool: &PgPool,
        role_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT menu_id FROM role_menus WHERE role_id = ANY($1)")
                .bind(role_ids.to_vec())
                .fetch_all(pool)
                .await?;

        Ok(ids)
    }

    /// Checks whether any role grants the menu
    pub async fn menu_is_granted(pool: &PgPool, menu_id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM role_menus WHERE menu_id = $1)")
                .bind(menu_id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Replaces the menu set of a role in one transaction
    pub async fn replace_for_role(
        pool: &PgPool,
        role_id: i64,
        menu_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        if !menu_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_menus (role_id, menu_id)
                SELECT $1, menu_id FROM UNNEST($2::BIGINT[]) AS t(menu_id)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id)
            .bind(menu_ids.to_vec())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
