/// Menu model and database operations
///
/// Menus form a forest through `parent_id`. A menu is a root when its
/// `parent_id` is NULL or 0.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE menu_type AS ENUM ('category', 'page', 'button');
///
/// CREATE TABLE menus (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(50) NOT NULL UNIQUE,
///     icon VARCHAR(100),
///     parent_id BIGINT,
///     order_num INTEGER,
///     path VARCHAR(200),
///     component VARCHAR(255),
///     menu_type menu_type,
///     perms VARCHAR(100),
///     remark VARCHAR(500),
///     create_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     update_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `parent_id` has no foreign key: a dangling parent simply makes the menu a
/// root when the tree is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Kind of navigation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "menu_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    /// Directory grouping other menus
    Category,

    /// Routable page
    Page,

    /// Button-level permission marker
    Button,
}

impl MenuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuType::Category => "category",
            MenuType::Page => "page",
            MenuType::Button => "button",
        }
    }
}

/// Menu model
///
/// Field order matches the wire shape of a menu tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Menu {
    pub id: i64,

    /// Display name, unique
    pub name: String,

    pub icon: Option<String>,

    /// Parent menu ID (None or 0 = root)
    pub parent_id: Option<i64>,

    /// Sibling position; None sorts after every numbered sibling
    pub order_num: Option<i32>,

    /// Client route path
    pub path: Option<String>,

    /// Client component reference
    pub component: Option<String>,

    pub menu_type: Option<MenuType>,

    /// Permission string, e.g. `system:user:list`
    pub perms: Option<String>,

    pub create_time: DateTime<Utc>,

    pub update_time: DateTime<Utc>,

    pub remark: Option<String>,
}

impl Menu {
    /// Parent ID with the legacy `0` sentinel folded into None
    pub fn parent(&self) -> Option<i64> {
        normalize_parent(self.parent_id)
    }

    /// Whether this menu sits at the top level
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }
}

/// Folds a zero or negative parent ID into None
pub fn normalize_parent(parent_id: Option<i64>) -> Option<i64> {
    parent_id.filter(|id| *id > 0)
}

/// Input for creating or updating a menu
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuInput {
    pub name: String,
    pub icon: Option<String>,
    pub parent_id: Option<i64>,
    pub order_num: Option<i32>,
    pub path: Option<String>,
    pub component: Option<String>,
    pub menu_type: Option<MenuType>,
    pub perms: Option<String>,
    pub remark: Option<String>,
}

const MENU_COLUMNS: &str = "id, name, icon, parent_id, order_num, path, component, menu_type, \
                            perms, create_time, update_time, remark";

impl Menu {
    /// Creates a new menu
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already used or the database
    /// connection fails
    pub async fn create(pool: &PgPool, data: MenuInput) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO menus (name, icon, parent_id, order_num, path, component, menu_type, perms, remark)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MENU_COLUMNS}
            "#
        );

        let menu = sqlx::query_as::<_, Menu>(&query)
            .bind(data.name)
            .bind(data.icon)
            .bind(normalize_parent(data.parent_id))
            .bind(data.order_num)
            .bind(data.path)
            .bind(data.component)
            .bind(data.menu_type)
            .bind(data.perms)
            .bind(data.remark)
            .fetch_one(pool)
            .await?;

        Ok(menu)
    }

    /// Replaces every editable field of a menu
    ///
    /// # Returns
    ///
    /// The updated menu if found, None if menu doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: MenuInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE menus
            SET name = $2, icon = $3, parent_id = $4, order_num = $5, path = $6,
                component = $7, menu_type = $8, perms = $9, remark = $10,
                update_time = NOW()
            WHERE id = $1
            RETURNING {MENU_COLUMNS}
            "#
        );

        let menu = sqlx::query_as::<_, Menu>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.icon)
            .bind(normalize_parent(data.parent_id))
            .bind(data.order_num)
            .bind(data.path)
            .bind(data.component)
            .bind(data.menu_type)
            .bind(data.perms)
            .bind(data.remark)
            .fetch_optional(pool)
            .await?;

        Ok(menu)
    }

    /// Finds a menu by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {MENU_COLUMNS} FROM menus WHERE id = $1");

        let menu = sqlx::query_as::<_, Menu>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(menu)
    }

    /// Fetches all menus whose ID is in `ids`, in a single query
    pub async fn find_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {MENU_COLUMNS} FROM menus WHERE id = ANY($1)");

        let menus = sqlx::query_as::<_, Menu>(&query)
            .bind(ids.to_vec())
            .fetch_all(pool)
            .await?;

        Ok(menus)
    }

    /// Lists every menu in sibling order
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {MENU_COLUMNS} FROM menus ORDER BY order_num ASC NULLS LAST, id ASC"
        );

        let menus = sqlx::query_as::<_, Menu>(&query).fetch_all(pool).await?;

        Ok(menus)
    }

    /// Checks whether a name is used by any menu other than `exclude`
    pub async fn name_exists(
        pool: &PgPool,
        name: &str,
        exclude: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM menus WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Checks whether any menu names `id` as its parent
    pub async fn has_children(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM menus WHERE parent_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Returns the subset of `ids` that refer to existing menus
    pub async fn existing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM menus WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(pool)
            .await?;

        Ok(found)
    }

    /// Deletes a menu
    ///
    /// Callers check the children and role-link guards first; the
    /// `role_menus` foreign key still rejects the delete if a link slipped in.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(id: i64, parent_id: Option<i64>) -> Menu {
        Menu {
            id,
            name: format!("menu-{id}"),
            icon: None,
            parent_id,
            order_num: None,
            path: None,
            component: None,
            menu_type: Some(MenuType::Page),
            perms: None,
            create_time: Utc::now(),
            update_time: Utc::now(),
            remark: None,
        }
    }

    #[test]
    fn test_zero_parent_is_root() {
        assert!(menu(1, None).is_root());
        assert!(menu(1, Some(0)).is_root());
        assert!(!menu(2, Some(1)).is_root());
        assert_eq!(menu(2, Some(1)).parent(), Some(1));
    }

    #[test]
    fn test_normalize_parent() {
        assert_eq!(normalize_parent(None), None);
        assert_eq!(normalize_parent(Some(0)), None);
        assert_eq!(normalize_parent(Some(-1)), None);
        assert_eq!(normalize_parent(Some(9)), Some(9));
    }

    #[test]
    fn test_menu_type_wire_names() {
        assert_eq!(MenuType::Category.as_str(), "category");
        assert_eq!(
            serde_json::to_value(MenuType::Button).unwrap(),
            serde_json::json!("button")
        );
    }
}
