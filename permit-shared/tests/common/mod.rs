// Fixtures shared by the integration tests
//
// Everything runs against `MemoryStore`; no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use permit_shared::auth::password::hash_password;
use permit_shared::models::{
    menu::{Menu, MenuInput},
    role::{Role, RoleInput},
    user::{CreateUser, User, UserProfile, UserStatus},
};
use permit_shared::store::{EntityStore, MemoryStore};

pub const PASSWORD: &str = "Adm1n@pass";

pub struct TestContext {
    pub store: Arc<dyn EntityStore>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Inserts a user whose credential is a placeholder, for tests that never log in
    pub async fn user(&self, username: &str) -> User {
        self.store
            .insert_user(CreateUser {
                username: username.to_string(),
                credential: "not-a-hash".to_string(),
                status: UserStatus::Enabled,
                profile: UserProfile::default(),
            })
            .await
            .expect("insert user")
    }

    /// Inserts a user with [`PASSWORD`] hashed
    pub async fn user_with_password(&self, username: &str) -> User {
        self.store
            .insert_user(CreateUser {
                username: username.to_string(),
                credential: hash_password(PASSWORD).expect("hash"),
                status: UserStatus::Enabled,
                profile: UserProfile::default(),
            })
            .await
            .expect("insert user")
    }

    /// Inserts a user whose stored credential is cleartext
    pub async fn legacy_user(&self, username: &str, cleartext: &str) -> User {
        self.store
            .insert_user(CreateUser {
                username: username.to_string(),
                credential: cleartext.to_string(),
                status: UserStatus::Enabled,
                profile: UserProfile::default(),
            })
            .await
            .expect("insert user")
    }

    pub async fn role(&self, name: &str) -> Role {
        self.store
            .insert_role(RoleInput {
                name: name.to_string(),
                code: name.to_lowercase(),
                remark: None,
            })
            .await
            .expect("insert role")
    }

    pub async fn menu(&self, name: &str, parent_id: Option<i64>, order_num: Option<i32>) -> Menu {
        self.store
            .insert_menu(MenuInput {
                name: name.to_string(),
                parent_id,
                order_num,
                ..Default::default()
            })
            .await
            .expect("insert menu")
    }

    pub async fn grant(&self, role: &Role, menus: &[&Menu]) {
        let ids: Vec<i64> = menus.iter().map(|m| m.id).collect();
        self.store
            .replace_role_menus(role.id, &ids)
            .await
            .expect("grant menus");
    }

    pub async fn assign(&self, user: &User, roles: &[&Role]) {
        let ids: Vec<i64> = roles.iter().map(|r| r.id).collect();
        self.store
            .replace_user_roles(user.id, &ids)
            .await
            .expect("assign roles");
    }
}
