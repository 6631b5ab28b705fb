/// Entity store abstraction
///
/// The RBAC core and the admin services never talk to the database directly.
/// They go through [`EntityStore`], a repository-style trait with two
/// backends:
///
/// - [`PgStore`](postgres::PgStore): PostgreSQL via sqlx, one transaction per
///   multi-statement mutation
/// - [`MemoryStore`](memory::MemoryStore): in-process tables behind a
///   `tokio::sync::RwLock`, used by tests and the `memory` backend
///
/// # Atomicity
///
/// `replace_user_roles`, `replace_role_menus`, `delete_user` and
/// `delete_role` each perform "delete links, then write" as one unit. A
/// failure midway must leave the previous state intact.
///
/// # Example
///
/// ```no_run
/// use permit_shared::store::{EntityStore, memory::MemoryStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let roles = store.role_ids_for_user(1).await?;
/// assert!(roles.is_empty());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{
    menu::{Menu, MenuInput},
    role::{Role, RoleInput},
    user::{CreateUser, User, UserProfile, UserStatus},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query or connection failure in the database backend
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write collided with a unique or foreign key constraint
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a search, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_num: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Largest page a caller may request
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Builds a page request, clamping zero/oversized values
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num: page_num.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page_num.saturating_sub(1)) * i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// A page of results plus the total match count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: i64,
    pub items: Vec<T>,
}

/// Repository-style access to users, roles, menus and their links
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Cheap round trip used by health checks
    async fn ping(&self) -> StoreResult<()>;

    // Users

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// True if `username` belongs to a user other than `exclude`
    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> StoreResult<bool>;

    async fn search_users(&self, query: &str, page: PageRequest) -> StoreResult<Page<User>>;

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn update_user_profile(&self, id: i64, profile: UserProfile) -> StoreResult<Option<User>>;

    async fn set_user_credential(&self, id: i64, credential: &str) -> StoreResult<bool>;

    async fn set_user_status(&self, id: i64, status: UserStatus) -> StoreResult<Option<User>>;

    async fn record_login(&self, id: i64) -> StoreResult<()>;

    /// Removes the user's role links, then the user, atomically
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    // Roles

    async fn find_role(&self, id: i64) -> StoreResult<Option<Role>>;

    /// Batch lookup; unknown IDs are silently absent from the result
    async fn find_roles(&self, ids: &[i64]) -> StoreResult<Vec<Role>>;

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    async fn search_roles(&self, query: &str, page: PageRequest) -> StoreResult<Page<Role>>;

    async fn role_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool>;

    async fn role_code_taken(&self, code: &str, exclude: Option<i64>) -> StoreResult<bool>;

    async fn insert_role(&self, data: RoleInput) -> StoreResult<Role>;

    async fn update_role(&self, id: i64, data: RoleInput) -> StoreResult<Option<Role>>;

    /// Removes the role's user and menu links, then the role, atomically
    async fn delete_role(&self, id: i64) -> StoreResult<bool>;

    /// Filters `ids` down to those naming existing roles
    async fn existing_role_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>>;

    // Menus

    async fn find_menu(&self, id: i64) -> StoreResult<Option<Menu>>;

    /// Batch lookup; unknown IDs are silently absent from the result
    async fn find_menus(&self, ids: &[i64]) -> StoreResult<Vec<Menu>>;

    async fn list_menus(&self) -> StoreResult<Vec<Menu>>;

    async fn menu_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool>;

    async fn menu_has_children(&self, id: i64) -> StoreResult<bool>;

    /// True if any role links to the menu
    async fn menu_is_granted(&self, id: i64) -> StoreResult<bool>;

    async fn insert_menu(&self, data: MenuInput) -> StoreResult<Menu>;

    async fn update_menu(&self, id: i64, data: MenuInput) -> StoreResult<Option<Menu>>;

    async fn delete_menu(&self, id: i64) -> StoreResult<bool>;

    /// Filters `ids` down to those naming existing menus
    async fn existing_menu_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>>;

    // Links

    async fn role_ids_for_user(&self, user_id: i64) -> StoreResult<Vec<i64>>;

    async fn menu_ids_for_role(&self, role_id: i64) -> StoreResult<Vec<i64>>;

    /// One entry per link across all `role_ids`; may contain duplicates
    async fn menu_ids_for_roles(&self, role_ids: &[i64]) -> StoreResult<Vec<i64>>;

    async fn replace_user_roles(&self, user_id: i64, role_ids: &[i64]) -> StoreResult<()>;

    async fn replace_role_menus(&self, role_id: i64, menu_ids: &[i64]) -> StoreResult<()>;
}
