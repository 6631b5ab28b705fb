/// Role administration

use std::sync::Arc;

use tracing::{info, warn};

use super::{optional, required, AssignmentReport};
use crate::error::{RbacError, RbacResult};
use crate::models::role::{Role, RoleInput, SUPERUSER_ROLE_NAME};
use crate::store::{EntityStore, Page, PageRequest};

const NAME_MAX_LEN: usize = 100;
const CODE_MAX_LEN: usize = 100;

#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn EntityStore>,
    superuser_role: String,
}

impl RoleService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self::with_superuser_role(store, SUPERUSER_ROLE_NAME)
    }

    /// Uses `name` as the protected superuser role
    pub fn with_superuser_role(store: Arc<dyn EntityStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            superuser_role: name.into(),
        }
    }

    pub fn superuser_role(&self) -> &str {
        &self.superuser_role
    }

    pub async fn list_all(&self) -> RbacResult<Vec<Role>> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn search(&self, query: &str, page: PageRequest) -> RbacResult<Page<Role>> {
        Ok(self.store.search_roles(query.trim(), page).await?)
    }

    pub async fn get(&self, id: i64) -> RbacResult<Role> {
        self.store
            .find_role(id)
            .await?
            .ok_or_else(|| RbacError::not_found("Role", id))
    }

    /// Creates a role (`id` None) or updates an existing one
    ///
    /// # Errors
    ///
    /// - `Validation` if name or code is blank
    /// - `NotFound` when updating a missing role
    /// - `Conflict` if another role already uses the name or code
    pub async fn save(&self, id: Option<i64>, input: RoleInput) -> RbacResult<Role> {
        let input = RoleInput {
            name: required("name", &input.name, NAME_MAX_LEN)?,
            code: required("code", &input.code, CODE_MAX_LEN)?,
            remark: optional(input.remark),
        };

        if let Some(id) = id {
            let current = self.get(id).await?;
            if current.name == self.superuser_role && input.name != current.name {
                return Err(RbacError::conflict("The superuser role cannot be renamed"));
            }
        }

        if self.store.role_name_taken(&input.name, id).await? {
            return Err(RbacError::conflict(format!("Role name '{}' already exists", input.name)));
        }
        if self.store.role_code_taken(&input.code, id).await? {
            return Err(RbacError::conflict(format!("Role code '{}' already exists", input.code)));
        }

        let role = match id {
            Some(id) => self
                .store
                .update_role(id, input)
                .await?
                .ok_or_else(|| RbacError::not_found("Role", id))?,
            None => self.store.insert_role(input).await?,
        };

        info!(role_id = role.id, name = %role.name, created = id.is_none(), "Role saved");
        Ok(role)
    }

    /// Deletes a role together with its user and menu links
    ///
    /// # Errors
    ///
    /// `Conflict` for the superuser role; the store is not touched.
    pub async fn delete(&self, id: i64) -> RbacResult<()> {
        let role = self.get(id).await?;

        if role.name == self.superuser_role {
            warn!(role_id = id, "Refusing to delete the superuser role");
            return Err(RbacError::conflict("The superuser role cannot be deleted"));
        }

        if !self.store.delete_role(id).await? {
            return Err(RbacError::not_found("Role", id));
        }

        info!(role_id = id, name = %role.name, "Role deleted");
        Ok(())
    }

    pub async fn menu_ids(&self, role_id: i64) -> RbacResult<Vec<i64>> {
        self.get(role_id).await?;
        Ok(self.store.menu_ids_for_role(role_id).await?)
    }

    /// Replaces the role's menu set
    ///
    /// Unknown menu IDs are skipped with a warning; the call still succeeds.
    pub async fn assign_permissions(
        &self,
        role_id: i64,
        menu_ids: &[i64],
    ) -> RbacResult<AssignmentReport> {
        self.get(role_id).await?;

        let existing = self.store.existing_menu_ids(menu_ids).await?;
        let report = AssignmentReport::partition(menu_ids, &existing);

        if !report.skipped.is_empty() {
            warn!(role_id, skipped = ?report.skipped, "Skipping unknown menu IDs");
        }

        self.store.replace_role_menus(role_id, &report.assigned).await?;

        info!(role_id, menus = report.assigned.len(), "Role permissions assigned");
        Ok(report)
    }
}
