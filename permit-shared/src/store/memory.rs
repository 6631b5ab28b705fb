/// In-memory store backend
///
/// Keeps every table in one [`Tables`] value behind a single
/// `tokio::sync::RwLock`. Each trait method takes the lock once, so the
/// multi-step mutations are atomic with respect to every other call.
///
/// Mirrors the PostgreSQL schema's constraints: unique names and codes,
/// restrictive foreign keys on the join tables and `BIGSERIAL`-style IDs.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{EntityStore, Page, PageRequest, StoreError, StoreResult};
use crate::models::{
    menu::{normalize_parent, Menu, MenuInput},
    role::{Role, RoleInput},
    user::{CreateUser, User, UserProfile, UserStatus},
};
use crate::rbac::order::sort_menus;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    menus: BTreeMap<i64, Menu>,
    user_roles: BTreeSet<(i64, i64)>,
    role_menus: BTreeSet<(i64, i64)>,
    next_user_id: i64,
    next_role_id: i64,
    next_menu_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T: Clone>(matches: Vec<&T>, page: PageRequest) -> Page<T> {
    let total = matches.len() as i64;
    let items = matches
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    Page { total, items }
}

/// True if any matching row is not the excluded one
fn taken(mut ids: impl Iterator<Item = i64>, exclude: Option<i64>) -> bool {
    ids.any(|id| Some(id) != exclude)
}

/// Store that lives entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        let matches = tables
            .users
            .values()
            .filter(|u| u.username == username)
            .map(|u| u.id);
        Ok(taken(matches, exclude))
    }

    async fn search_users(&self, query: &str, page: PageRequest) -> StoreResult<Page<User>> {
        let tables = self.tables.read().await;
        let matches = tables
            .users
            .values()
            .filter(|u| contains_ignore_case(&u.username, query))
            .collect();
        Ok(paginate(matches, page))
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == data.username) {
            return Err(StoreError::Constraint(format!(
                "username '{}' already exists",
                data.username
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Tables::next_id(&mut tables.next_user_id),
            username: data.username,
            credential: data.credential,
            status: data.status,
            email: data.profile.email,
            phone: data.profile.phone,
            avatar: data.profile.avatar,
            remark: data.profile.remark,
            last_login_at: None,
            create_time: now,
            update_time: now,
        };

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user_profile(&self, id: i64, profile: UserProfile) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.email = profile.email;
            user.phone = profile.phone;
            user.avatar = profile.avatar;
            user.remark = profile.remark;
            user.update_time = Utc::now();
            user.clone()
        }))
    }

    async fn set_user_credential(&self, id: i64, credential: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(&id) {
            Some(user) => {
                user.credential = credential.to_string();
                user.update_time = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_user_status(&self, id: i64, status: UserStatus) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.status = status;
            user.update_time = Utc::now();
            user.clone()
        }))
    }

    async fn record_login(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        tables.user_roles.retain(|(user_id, _)| *user_id != id);
        Ok(tables.users.remove(&id).is_some())
    }

    async fn find_role(&self, id: i64) -> StoreResult<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn find_roles(&self, ids: &[i64]) -> StoreResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<i64> = ids.iter().copied().collect();
        Ok(wanted
            .iter()
            .filter_map(|id| tables.roles.get(id).cloned())
            .collect())
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.tables.read().await.roles.values().cloned().collect())
    }

    async fn search_roles(&self, query: &str, page: PageRequest) -> StoreResult<Page<Role>> {
        let tables = self.tables.read().await;
        let matches = tables
            .roles
            .values()
            .filter(|r| contains_ignore_case(&r.name, query))
            .collect();
        Ok(paginate(matches, page))
    }

    async fn role_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        let matches = tables
            .roles
            .values()
            .filter(|r| r.name == name)
            .map(|r| r.id);
        Ok(taken(matches, exclude))
    }

    async fn role_code_taken(&self, code: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        let matches = tables
            .roles
            .values()
            .filter(|r| r.code == code)
            .map(|r| r.id);
        Ok(taken(matches, exclude))
    }

    async fn insert_role(&self, data: RoleInput) -> StoreResult<Role> {
        let mut tables = self.tables.write().await;

        if tables
            .roles
            .values()
            .any(|r| r.name == data.name || r.code == data.code)
        {
            return Err(StoreError::Constraint(format!(
                "role name '{}' or code '{}' already exists",
                data.name, data.code
            )));
        }

        let now = Utc::now();
        let role = Role {
            id: Tables::next_id(&mut tables.next_role_id),
            name: data.name,
            code: data.code,
            remark: data.remark,
            create_time: now,
            update_time: now,
        };

        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: i64, data: RoleInput) -> StoreResult<Option<Role>> {
        let mut tables = self.tables.write().await;

        if tables
            .roles
            .values()
            .any(|r| r.id != id && (r.name == data.name || r.code == data.code))
        {
            return Err(StoreError::Constraint(format!(
                "role name '{}' or code '{}' already exists",
                data.name, data.code
            )));
        }

        Ok(tables.roles.get_mut(&id).map(|role| {
            role.name = data.name;
            role.code = data.code;
            role.remark = data.remark;
            role.update_time = Utc::now();
            role.clone()
        }))
    }

    async fn delete_role(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        tables.user_roles.retain(|(_, role_id)| *role_id != id);
        tables.role_menus.retain(|(role_id, _)| *role_id != id);
        Ok(tables.roles.remove(&id).is_some())
    }

    async fn existing_role_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.roles.contains_key(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    async fn find_menu(&self, id: i64) -> StoreResult<Option<Menu>> {
        Ok(self.tables.read().await.menus.get(&id).cloned())
    }

    async fn find_menus(&self, ids: &[i64]) -> StoreResult<Vec<Menu>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<i64> = ids.iter().copied().collect();
        Ok(wanted
            .iter()
            .filter_map(|id| tables.menus.get(id).cloned())
            .collect())
    }

    async fn list_menus(&self) -> StoreResult<Vec<Menu>> {
        let mut menus: Vec<Menu> = self.tables.read().await.menus.values().cloned().collect();
        sort_menus(&mut menus);
        Ok(menus)
    }

    async fn menu_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        let matches = tables
            .menus
            .values()
            .filter(|m| m.name == name)
            .map(|m| m.id);
        Ok(taken(matches, exclude))
    }

    async fn menu_has_children(&self, id: i64) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.menus.values().any(|m| m.parent() == Some(id)))
    }

    async fn menu_is_granted(&self, id: i64) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.role_menus.iter().any(|(_, menu_id)| *menu_id == id))
    }

    async fn insert_menu(&self, data: MenuInput) -> StoreResult<Menu> {
        let mut tables = self.tables.write().await;

        if tables.menus.values().any(|m| m.name == data.name) {
            return Err(StoreError::Constraint(format!(
                "menu name '{}' already exists",
                data.name
            )));
        }

        let now = Utc::now();
        let menu = Menu {
            id: Tables::next_id(&mut tables.next_menu_id),
            name: data.name,
            icon: data.icon,
            parent_id: normalize_parent(data.parent_id),
            order_num: data.order_num,
            path: data.path,
            component: data.component,
            menu_type: data.menu_type,
            perms: data.perms,
            create_time: now,
            update_time: now,
            remark: data.remark,
        };

        tables.menus.insert(menu.id, menu.clone());
        Ok(menu)
    }

    async fn update_menu(&self, id: i64, data: MenuInput) -> StoreResult<Option<Menu>> {
        let mut tables = self.tables.write().await;

        if tables
            .menus
            .values()
            .any(|m| m.id != id && m.name == data.name)
        {
            return Err(StoreError::Constraint(format!(
                "menu name '{}' already exists",
                data.name
            )));
        }

        Ok(tables.menus.get_mut(&id).map(|menu| {
            menu.name = data.name;
            menu.icon = data.icon;
            menu.parent_id = normalize_parent(data.parent_id);
            menu.order_num = data.order_num;
            menu.path = data.path;
            menu.component = data.component;
            menu.menu_type = data.menu_type;
            menu.perms = data.perms;
            menu.remark = data.remark;
            menu.update_time = Utc::now();
            menu.clone()
        }))
    }

    async fn delete_menu(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.role_menus.iter().any(|(_, menu_id)| *menu_id == id) {
            return Err(StoreError::Constraint(format!(
                "menu {id} is still referenced by role_menus"
            )));
        }

        Ok(tables.menus.remove(&id).is_some())
    }

    async fn existing_menu_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.menus.contains_key(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    async fn role_ids_for_user(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, role_id)| *role_id)
            .collect())
    }

    async fn menu_ids_for_role(&self, role_id: i64) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_menus
            .iter()
            .filter(|(rid, _)| *rid == role_id)
            .map(|(_, menu_id)| *menu_id)
            .collect())
    }

    async fn menu_ids_for_roles(&self, role_ids: &[i64]) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_menus
            .iter()
            .filter(|(rid, _)| role_ids.contains(rid))
            .map(|(_, menu_id)| *menu_id)
            .collect())
    }

    async fn replace_user_roles(&self, user_id: i64, role_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Constraint(format!("user {user_id} does not exist")));
        }
        if let Some(missing) = role_ids.iter().find(|id| !tables.roles.contains_key(id)) {
            return Err(StoreError::Constraint(format!("role {missing} does not exist")));
        }

        tables.user_roles.retain(|(uid, _)| *uid != user_id);
        tables
            .user_roles
            .extend(role_ids.iter().map(|role_id| (user_id, *role_id)));
        Ok(())
    }

    async fn replace_role_menus(&self, role_id: i64, menu_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.roles.contains_key(&role_id) {
            return Err(StoreError::Constraint(format!("role {role_id} does not exist")));
        }
        if let Some(missing) = menu_ids.iter().find(|id| !tables.menus.contains_key(id)) {
            return Err(StoreError::Constraint(format!("menu {missing} does not exist")));
        }

        tables.role_menus.retain(|(rid, _)| *rid != role_id);
        tables
            .role_menus
            .extend(menu_ids.iter().map(|menu_id| (role_id, *menu_id)));
        Ok(())
    }
}
