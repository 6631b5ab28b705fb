/// Database models for Permit
///
/// This module contains the RBAC entities and their PostgreSQL operations.
///
/// # Models
///
/// - `user`: Administrator accounts and credentials
/// - `role`: Named permission groups with a unique permission code
/// - `menu`: Hierarchical navigation entries (categories, pages, buttons)
/// - `user_role`: User ↔ Role join relation
/// - `role_menu`: Role ↔ Menu join relation
///
/// Join relations carry no attributes besides the two ids and are only ever
/// replaced as a whole set per owner.
///
/// # Example
///
/// ```no_run
/// use permit_shared::models::role::{Role, RoleInput};
/// use permit_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let role = Role::create(&pool, RoleInput {
///     name: "Auditor".to_string(),
///     code: "auditor".to_string(),
///     remark: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod menu;
pub mod role;
pub mod role_menu;
pub mod user;
pub mod user_role;
