/// Menu administration
///
/// Besides name uniqueness, saving a menu keeps the hierarchy a forest:
/// a menu cannot be its own parent, the parent must exist, and re-parenting
/// a menu under one of its own descendants is refused.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use super::{optional, required};
use crate::error::{RbacError, RbacResult};
use crate::models::menu::{normalize_parent, Menu, MenuInput};
use crate::rbac::tree::{build_tree, MenuTreeNode};
use crate::store::EntityStore;

const NAME_MAX_LEN: usize = 50;

#[derive(Clone)]
pub struct MenuService {
    store: Arc<dyn EntityStore>,
}

impl MenuService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Every menu, flat, in display order
    pub async fn list_all(&self) -> RbacResult<Vec<Menu>> {
        Ok(self.store.list_menus().await?)
    }

    /// Every menu arranged as a forest
    pub async fn tree(&self) -> RbacResult<Vec<MenuTreeNode>> {
        Ok(build_tree(self.store.list_menus().await?))
    }

    pub async fn get(&self, id: i64) -> RbacResult<Menu> {
        self.store
            .find_menu(id)
            .await?
            .ok_or_else(|| RbacError::not_found("Menu", id))
    }

    /// Creates a menu (`id` None) or updates an existing one
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is blank
    /// - `NotFound` for a missing menu or parent
    /// - `Conflict` for a duplicate name, self-parenting or a parent cycle
    pub async fn save(&self, id: Option<i64>, input: MenuInput) -> RbacResult<Menu> {
        let input = MenuInput {
            name: required("name", &input.name, NAME_MAX_LEN)?,
            icon: optional(input.icon),
            parent_id: normalize_parent(input.parent_id),
            order_num: input.order_num,
            path: optional(input.path),
            component: optional(input.component),
            menu_type: input.menu_type,
            perms: optional(input.perms),
            remark: optional(input.remark),
        };

        if let Some(id) = id {
            self.get(id).await?;
        }

        if self.store.menu_name_taken(&input.name, id).await? {
            return Err(RbacError::conflict(format!("Menu name '{}' already exists", input.name)));
        }

        if let Some(parent_id) = input.parent_id {
            if Some(parent_id) == id {
                return Err(RbacError::conflict("A menu cannot be its own parent"));
            }
            self.store
                .find_menu(parent_id)
                .await?
                .ok_or_else(|| RbacError::not_found("Menu", parent_id))?;

            if let Some(id) = id {
                self.ensure_not_descendant(id, parent_id).await?;
            }
        }

        let menu = match id {
            Some(id) => self
                .store
                .update_menu(id, input)
                .await?
                .ok_or_else(|| RbacError::not_found("Menu", id))?,
            None => self.store.insert_menu(input).await?,
        };

        info!(menu_id = menu.id, name = %menu.name, parent_id = ?menu.parent_id, created = id.is_none(), "Menu saved");
        Ok(menu)
    }

    /// Fails if `candidate_parent` lies in the subtree rooted at `id`
    async fn ensure_not_descendant(&self, id: i64, candidate_parent: i64) -> RbacResult<()> {
        let parents: HashMap<i64, Option<i64>> = self
            .store
            .list_menus()
            .await?
            .into_iter()
            .map(|m| (m.id, m.parent()))
            .collect();

        let mut seen = HashSet::new();
        let mut cursor = Some(candidate_parent);

        while let Some(current) = cursor {
            if current == id {
                warn!(menu_id = id, parent_id = candidate_parent, "Refusing parent cycle");
                return Err(RbacError::conflict(
                    "A menu cannot be moved under one of its own descendants",
                ));
            }
            if !seen.insert(current) {
                // Pre-existing cycle above the candidate; it does not involve `id`
                break;
            }
            cursor = parents.get(&current).copied().flatten();
        }

        Ok(())
    }

    /// Deletes a menu that has no children and is granted to no role
    pub async fn delete(&self, id: i64) -> RbacResult<()> {
        let menu = self.get(id).await?;

        if self.store.menu_has_children(id).await? {
            return Err(RbacError::conflict("Menu has child menus and cannot be deleted"));
        }
        if self.store.menu_is_granted(id).await? {
            return Err(RbacError::conflict("Menu is assigned to a role and cannot be deleted"));
        }

        if !self.store.delete_menu(id).await? {
            return Err(RbacError::not_found("Menu", id));
        }

        info!(menu_id = id, name = %menu.name, "Menu deleted");
        Ok(())
    }
}
