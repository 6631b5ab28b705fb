/// PostgreSQL store backend
///
/// Thin delegation to the model methods in [`crate::models`]. Constraint
/// violations are surfaced as [`StoreError::Constraint`] so the services can
/// tell a lost uniqueness race from an outage.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{EntityStore, Page, PageRequest, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    menu::{Menu, MenuInput},
    role::{Role, RoleInput},
    role_menu::RoleMenu,
    user::{CreateUser, User, UserProfile, UserStatus},
    user_role::UserRole,
};

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl EntityStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> StoreResult<bool> {
        Ok(User::username_exists(&self.pool, username, exclude).await?)
    }

    async fn search_users(&self, query: &str, page: PageRequest) -> StoreResult<Page<User>> {
        let total = User::count_matching(&self.pool, query).await?;
        let items = User::search(&self.pool, query, page.limit(), page.offset()).await?;
        Ok(Page { total, items })
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data).await.map_err(map_err)
    }

    async fn update_user_profile(&self, id: i64, profile: UserProfile) -> StoreResult<Option<User>> {
        Ok(User::update_profile(&self.pool, id, profile).await?)
    }

    async fn set_user_credential(&self, id: i64, credential: &str) -> StoreResult<bool> {
        Ok(User::set_credential(&self.pool, id, credential).await?)
    }

    async fn set_user_status(&self, id: i64, status: UserStatus) -> StoreResult<Option<User>> {
        Ok(User::set_status(&self.pool, id, status).await?)
    }

    async fn record_login(&self, id: i64) -> StoreResult<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        User::delete_with_links(&self.pool, id).await.map_err(map_err)
    }

    async fn find_role(&self, id: i64) -> StoreResult<Option<Role>> {
        Ok(Role::find_by_id(&self.pool, id).await?)
    }

    async fn find_roles(&self, ids: &[i64]) -> StoreResult<Vec<Role>> {
        Ok(Role::find_by_ids(&self.pool, ids).await?)
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(Role::find_by_name(&self.pool, name).await?)
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(Role::list_all(&self.pool).await?)
    }

    async fn search_roles(&self, query: &str, page: PageRequest) -> StoreResult<Page<Role>> {
        let total = Role::count_matching(&self.pool, query).await?;
        let items = Role::search(&self.pool, query, page.limit(), page.offset()).await?;
        Ok(Page { total, items })
    }

    async fn role_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        Ok(Role::name_exists(&self.pool, name, exclude).await?)
    }

    async fn role_code_taken(&self, code: &str, exclude: Option<i64>) -> StoreResult<bool> {
        Ok(Role::code_exists(&self.pool, code, exclude).await?)
    }

    async fn insert_role(&self, data: RoleInput) -> StoreResult<Role> {
        Role::create(&self.pool, data).await.map_err(map_err)
    }

    async fn update_role(&self, id: i64, data: RoleInput) -> StoreResult<Option<Role>> {
        Role::update(&self.pool, id, data).await.map_err(map_err)
    }

    async fn delete_role(&self, id: i64) -> StoreResult<bool> {
        Role::delete_with_links(&self.pool, id).await.map_err(map_err)
    }

    async fn existing_role_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Role::existing_ids(&self.pool, ids).await?)
    }

    async fn find_menu(&self, id: i64) -> StoreResult<Option<Menu>> {
        Ok(Menu::find_by_id(&self.pool, id).await?)
    }

    async fn find_menus(&self, ids: &[i64]) -> StoreResult<Vec<Menu>> {
        Ok(Menu::find_by_ids(&self.pool, ids).await?)
    }

    async fn list_menus(&self) -> StoreResult<Vec<Menu>> {
        Ok(Menu::list_all(&self.pool).await?)
    }

    async fn menu_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        Ok(Menu::name_exists(&self.pool, name, exclude).await?)
    }

    async fn menu_has_children(&self, id: i64) -> StoreResult<bool> {
        Ok(Menu::has_children(&self.pool, id).await?)
    }

    async fn menu_is_granted(&self, id: i64) -> StoreResult<bool> {
        Ok(RoleMenu::menu_is_granted(&self.pool, id).await?)
    }

    async fn insert_menu(&self, data: MenuInput) -> StoreResult<Menu> {
        Menu::create(&self.pool, data).await.map_err(map_err)
    }

    async fn update_menu(&self, id: i64, data: MenuInput) -> StoreResult<Option<Menu>> {
        Menu::update(&self.pool, id, data).await.map_err(map_err)
    }

    async fn delete_menu(&self, id: i64) -> StoreResult<bool> {
        Menu::delete(&self.pool, id).await.map_err(map_err)
    }

    async fn existing_menu_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Menu::existing_ids(&self.pool, ids).await?)
    }

    async fn role_ids_for_user(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        Ok(UserRole::role_ids_for_user(&self.pool, user_id).await?)
    }

    async fn menu_ids_for_role(&self, role_id: i64) -> StoreResult<Vec<i64>> {
        Ok(RoleMenu::menu_ids_for_role(&self.pool, role_id).await?)
    }

    async fn menu_ids_for_roles(&self, role_ids: &[i64]) -> StoreResult<Vec<i64>> {
        Ok(RoleMenu::menu_ids_for_roles(&self.pool, role_ids).await?)
    }

    async fn replace_user_roles(&self, user_id: i64, role_ids: &[i64]) -> StoreResult<()> {
        UserRole::replace_for_user(&self.pool, user_id, role_ids)
            .await
            .map_err(map_err)
    }

    async fn replace_role_menus(&self, role_id: i64, menu_ids: &[i64]) -> StoreResult<()> {
        RoleMenu::replace_for_role(&self.pool, role_id, menu_ids)
            .await
            .map_err(map_err)
    }
}
