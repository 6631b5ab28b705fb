/// Permission resolver
///
/// Derives what a user may see from the roles linked to them:
///
/// ```text
/// user ──user_roles──▶ role ids ──role_menus──▶ menu ids ──dedup──▶ menus
/// ```
///
/// Three batched store calls regardless of how many roles or menus are
/// involved. The resolver is read-only and does not check that the user
/// exists; an unknown user simply has no roles.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::tree::{build_tree, MenuTreeNode};
use crate::error::RbacResult;
use crate::models::menu::Menu;
use crate::store::EntityStore;

/// Resolves a user's effective menu permissions
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn EntityStore>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Returns every menu granted to the user through any of their roles
    ///
    /// A menu granted by several roles appears once. The result is in id
    /// order; display order is the tree builder's job.
    ///
    /// # Errors
    ///
    /// Only store failures, as [`RbacError::Storage`](crate::error::RbacError::Storage)
    pub async fn resolve_menus(&self, user_id: i64) -> RbacResult<Vec<Menu>> {
        let role_ids = self.store.role_ids_for_user(user_id).await?;
        if role_ids.is_empty() {
            debug!(user_id, "User has no roles");
            return Ok(Vec::new());
        }

        let menu_ids: BTreeSet<i64> = self
            .store
            .menu_ids_for_roles(&role_ids)
            .await?
            .into_iter()
            .collect();
        if menu_ids.is_empty() {
            debug!(user_id, roles = role_ids.len(), "Roles grant no menus");
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = menu_ids.into_iter().collect();
        let mut menus = self.store.find_menus(&ids).await?;
        menus.sort_by_key(|m| m.id);
        menus.dedup_by_key(|m| m.id);

        debug!(
            user_id,
            roles = role_ids.len(),
            menus = menus.len(),
            "Resolved menu permissions"
        );

        Ok(menus)
    }

    /// Resolves the user's menus and arranges them as a navigation forest
    pub async fn resolve_tree(&self, user_id: i64) -> RbacResult<Vec<MenuTreeNode>> {
        let menus = self.resolve_menus(user_id).await?;
        Ok(build_tree(menus))
    }

    /// Returns the codes of the user's roles, sorted and deduplicated
    ///
    /// Role ids whose role has since vanished are ignored.
    pub async fn resolve_role_codes(&self, user_id: i64) -> RbacResult<Vec<String>> {
        let role_ids = self.store.role_ids_for_user(user_id).await?;

        let codes: BTreeSet<String> = self
            .store
            .find_roles(&role_ids)
            .await?
            .into_iter()
            .map(|role| role.code)
            .collect();

        Ok(codes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        menu::MenuInput,
        role::RoleInput,
        user::{CreateUser, UserProfile, UserStatus},
    };
    use crate::store::MemoryStore;

    async fn seeded() -> (Arc<MemoryStore>, i64) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(CreateUser {
                username: "alice".into(),
                credential: "x".into(),
                status: UserStatus::Enabled,
                profile: UserProfile::default(),
            })
            .await
            .unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn test_user_without_roles_resolves_empty() {
        let (store, user_id) = seeded().await;
        let resolver = PermissionResolver::new(store);

        assert!(resolver.resolve_menus(user_id).await.unwrap().is_empty());
        assert!(resolver.resolve_tree(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_resolves_empty() {
        let (store, _) = seeded().await;
        let resolver = PermissionResolver::new(store);
        assert!(resolver.resolve_menus(404).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_role_codes_sorted() {
        let (store, user_id) = seeded().await;
        let mut ids = Vec::new();
        for (name, code) in [("Ops", "ops"), ("Audit", "audit")] {
            let role = store
                .insert_role(RoleInput {
                    name: name.into(),
                    code: code.into(),
                    remark: None,
                })
                .await
                .unwrap();
            ids.push(role.id);
        }
        store.replace_user_roles(user_id, &ids).await.unwrap();

        let resolver = PermissionResolver::new(store);
        assert_eq!(
            resolver.resolve_role_codes(user_id).await.unwrap(),
            vec!["audit".to_string(), "ops".to_string()]
        );
    }

    #[tokio::test]
    async fn test_role_without_menus_resolves_empty() {
        let (store, user_id) = seeded().await;
        let role = store
            .insert_role(RoleInput {
                name: "Empty".into(),
                code: "empty".into(),
                remark: None,
            })
            .await
            .unwrap();
        store
            .insert_menu(MenuInput {
                name: "Unrelated".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store.replace_user_roles(user_id, &[role.id]).await.unwrap();

        let resolver = PermissionResolver::new(store);
        assert!(resolver.resolve_menus(user_id).await.unwrap().is_empty());
    }
}
