/// First-run provisioning
///
/// [`ensure_superuser`] makes sure the superuser role exists, that the admin
/// account exists and holds it, and that the role is granted every menu.
/// Running it again on a provisioned store only re-syncs the menu grants.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{RbacError, RbacResult};
use crate::models::role::{RoleInput, SUPERUSER_ROLE_CODE};
use crate::models::user::{CreateUser, UserProfile, UserStatus};
use crate::store::EntityStore;

/// What [`ensure_superuser`] found or created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub role_id: i64,
    pub user_id: i64,
    pub created_role: bool,
    pub created_user: bool,
    pub granted_menus: usize,
}

/// Idempotently provisions the superuser role and admin account
///
/// The password is only used when the account has to be created; an existing
/// account keeps its credential.
pub async fn ensure_superuser(
    store: &Arc<dyn EntityStore>,
    role_name: &str,
    username: &str,
    password: &str,
) -> RbacResult<BootstrapReport> {
    let (role, created_role) = match store.find_role_by_name(role_name).await? {
        Some(role) => (role, false),
        None => {
            if store.role_code_taken(SUPERUSER_ROLE_CODE, None).await? {
                return Err(RbacError::conflict(format!(
                    "Role code '{SUPERUSER_ROLE_CODE}' is used by another role"
                )));
            }
            let role = store
                .insert_role(RoleInput {
                    name: role_name.to_string(),
                    code: SUPERUSER_ROLE_CODE.to_string(),
                    remark: Some("Built-in superuser role".to_string()),
                })
                .await?;
            info!(role_id = role.id, name = %role.name, "Created superuser role");
            (role, true)
        }
    };

    let (user, created_user) = match store.find_user_by_username(username).await? {
        Some(user) => (user, false),
        None => {
            validate_password_strength(password)?;
            let user = store
                .insert_user(CreateUser {
                    username: username.to_string(),
                    credential: hash_password(password)?,
                    status: UserStatus::Enabled,
                    profile: UserProfile::default(),
                })
                .await?;
            info!(user_id = user.id, username = %user.username, "Created admin user");
            (user, true)
        }
    };

    let mut role_ids = store.role_ids_for_user(user.id).await?;
    if !role_ids.contains(&role.id) {
        role_ids.push(role.id);
        store.replace_user_roles(user.id, &role_ids).await?;
        info!(user_id = user.id, role_id = role.id, "Linked admin user to superuser role");
    }

    let menu_ids: Vec<i64> = store.list_menus().await?.into_iter().map(|m| m.id).collect();
    store.replace_role_menus(role.id, &menu_ids).await?;

    Ok(BootstrapReport {
        role_id: role.id,
        user_id: user.id,
        created_role,
        created_user,
        granted_menus: menu_ids.len(),
    })
}
