/// User administration

use std::sync::Arc;

use tracing::{info, warn};

use super::{optional, required, AssignmentReport};
use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{RbacError, RbacResult};
use crate::models::user::{CreateUser, User, UserProfile, UserStatus};
use crate::store::{EntityStore, Page, PageRequest};

const USERNAME_MAX_LEN: usize = 100;

/// Input for creating a user
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    /// Plaintext; hashed before it reaches the store
    pub password: String,
    pub status: UserStatus,
    pub profile: UserProfile,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("status", &self.status)
            .field("profile", &self.profile)
            .finish()
    }
}

fn clean_profile(profile: UserProfile) -> UserProfile {
    UserProfile {
        email: optional(profile.email),
        phone: optional(profile.phone),
        avatar: optional(profile.avatar),
        remark: optional(profile.remark),
    }
}

fn ensure_not_self_disable(actor_id: i64, id: i64, status: UserStatus) -> RbacResult<()> {
    if actor_id == id && !status.is_enabled() {
        return Err(RbacError::conflict("You cannot disable your own account"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn EntityStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn search(&self, query: &str, page: PageRequest) -> RbacResult<Page<User>> {
        Ok(self.store.search_users(query.trim(), page).await?)
    }

    pub async fn get(&self, id: i64) -> RbacResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| RbacError::not_found("User", id))
    }

    /// Creates a user with a freshly hashed credential
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank username or weak password
    /// - `Conflict` if the username is taken
    pub async fn create(&self, input: NewUser) -> RbacResult<User> {
        let username = required("username", &input.username, USERNAME_MAX_LEN)?;
        validate_password_strength(&input.password)?;

        if self.store.username_taken(&username, None).await? {
            return Err(RbacError::conflict(format!("Username '{username}' already exists")));
        }

        let credential = hash_password(&input.password)?;
        let user = self
            .store
            .insert_user(CreateUser {
                username,
                credential,
                status: input.status,
                profile: clean_profile(input.profile),
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Replaces the profile fields of a user
    pub async fn update_profile(&self, id: i64, profile: UserProfile) -> RbacResult<User> {
        let user = self
            .store
            .update_user_profile(id, clean_profile(profile))
            .await?
            .ok_or_else(|| RbacError::not_found("User", id))?;

        info!(user_id = id, "User profile updated");
        Ok(user)
    }

    /// Applies an administrator's edit: profile fields plus an optional status
    ///
    /// Every check runs before the first write, so a refused edit stores
    /// nothing.
    ///
    /// # Errors
    ///
    /// - `Conflict` if `actor_id` disables their own account
    /// - `NotFound` if the user does not exist
    pub async fn update(
        &self,
        actor_id: i64,
        id: i64,
        profile: UserProfile,
        status: Option<UserStatus>,
    ) -> RbacResult<User> {
        if let Some(status) = status {
            ensure_not_self_disable(actor_id, id, status)?;
        }
        let current = self.get(id).await?;

        let user = self.update_profile(id, profile).await?;
        match status {
            Some(status) if status != current.status => self.set_status(actor_id, id, status).await,
            _ => Ok(user),
        }
    }

    pub async fn reset_password(&self, id: i64, password: &str) -> RbacResult<()> {
        validate_password_strength(password)?;
        self.get(id).await?;

        let credential = hash_password(password)?;
        if !self.store.set_user_credential(id, &credential).await? {
            return Err(RbacError::not_found("User", id));
        }

        info!(user_id = id, "Password reset");
        Ok(())
    }

    /// Enables or disables an account
    ///
    /// An administrator cannot disable their own account.
    pub async fn set_status(&self, actor_id: i64, id: i64, status: UserStatus) -> RbacResult<User> {
        ensure_not_self_disable(actor_id, id, status)?;

        let user = self
            .store
            .set_user_status(id, status)
            .await?
            .ok_or_else(|| RbacError::not_found("User", id))?;

        info!(user_id = id, status = status.as_str(), "User status changed");
        Ok(user)
    }

    /// Deletes a user and its role links
    pub async fn delete(&self, actor_id: i64, id: i64) -> RbacResult<()> {
        if actor_id == id {
            return Err(RbacError::conflict("You cannot delete your own account"));
        }
        self.get(id).await?;

        if !self.store.delete_user(id).await? {
            return Err(RbacError::not_found("User", id));
        }

        info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn role_ids(&self, user_id: i64) -> RbacResult<Vec<i64>> {
        self.get(user_id).await?;
        Ok(self.store.role_ids_for_user(user_id).await?)
    }

    /// Replaces the user's role set
    ///
    /// Unknown role IDs are skipped with a warning; the call still succeeds.
    pub async fn assign_roles(&self, user_id: i64, role_ids: &[i64]) -> RbacResult<AssignmentReport> {
        self.get(user_id).await?;

        let existing = self.store.existing_role_ids(role_ids).await?;
        let report = AssignmentReport::partition(role_ids, &existing);

        if !report.skipped.is_empty() {
            warn!(user_id, skipped = ?report.skipped, "Skipping unknown role IDs");
        }

        self.store.replace_user_roles(user_id, &report.assigned).await?;

        info!(user_id, roles = ?report.assigned, "User roles assigned");
        Ok(report)
    }
}
