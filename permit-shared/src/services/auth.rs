/// Login and current-user views
///
/// # Login flow
///
/// 1. Look the user up by name
/// 2. Verify the password with the configured [`MigratingVerifier`]
/// 3. Refuse disabled accounts
/// 4. Re-hash a legacy cleartext credential that just matched
/// 5. Record the login, issue tokens, resolve roles and the menu tree
///
/// Steps 1 to 3 fail with the same message, so a caller cannot tell an
/// unknown username from a wrong password or a disabled account. An unknown
/// username still pays for one Argon2 verification.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::jwt::{create_token, issue_pair, validate_refresh_token, Claims, TokenType};
use crate::auth::password::{
    hash_password, verify_against_dummy, CredentialVerifier, MigratingVerifier,
};
use crate::error::{RbacError, RbacResult};
use crate::models::user::User;
use crate::rbac::{MenuTreeNode, PermissionResolver};
use crate::store::EntityStore;

/// The one message every failed login gets
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// What a successful login hands back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    pub roles: Vec<String>,
    pub menus: Vec<MenuTreeNode>,
}

/// Profile view of the current user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user: User,
    pub roles: Vec<String>,
    pub menus: Vec<MenuTreeNode>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn EntityStore>,
    resolver: PermissionResolver,
    verifier: MigratingVerifier,
    secret: Arc<str>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        verifier: MigratingVerifier,
        secret: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            resolver: PermissionResolver::new(store.clone()),
            store,
            verifier,
            secret: secret.into(),
        }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Authenticates a user and assembles their session payload
    ///
    /// # Errors
    ///
    /// - `Validation` if username or password is blank
    /// - `Auth` with [`INVALID_CREDENTIALS`] for any credential failure
    pub async fn login(&self, username: &str, password: &str) -> RbacResult<LoginOutcome> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RbacError::validation("username", "must not be empty"));
        }
        if password.is_empty() {
            return Err(RbacError::validation("password", "must not be empty"));
        }

        let Some(user) = self.store.find_user_by_username(username).await? else {
            // Same Argon2 cost as a wrong password
            verify_against_dummy(password);
            info!(username, "Login failed: unknown user");
            return Err(RbacError::Auth(INVALID_CREDENTIALS.to_string()));
        };

        let verification = self.verifier.verify(&user.credential, password)?;
        if !verification.is_match() {
            info!(user_id = user.id, "Login failed: wrong password");
            return Err(RbacError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        if !user.status.is_enabled() {
            info!(user_id = user.id, "Login failed: account disabled");
            return Err(RbacError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        if verification.needs_rehash() {
            let credential = hash_password(password)?;
            self.store.set_user_credential(user.id, &credential).await?;
            warn!(user_id = user.id, "Migrated legacy cleartext credential to Argon2id");
        }

        self.store.record_login(user.id).await?;

        let (access_token, refresh_token) = issue_pair(user.id, &user.username, &self.secret)?;
        let roles = self.resolver.resolve_role_codes(user.id).await?;
        let menus = self.resolver.resolve_tree(user.id).await?;

        info!(user_id = user.id, roles = roles.len(), "User logged in");

        Ok(LoginOutcome {
            access_token,
            refresh_token,
            user,
            roles,
            menus,
        })
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// The user must still exist and be enabled.
    pub async fn refresh(&self, refresh_token: &str) -> RbacResult<String> {
        let claims = validate_refresh_token(refresh_token, &self.secret)?;

        let user = match self.store.find_user(claims.sub).await? {
            Some(user) if user.status.is_enabled() => user,
            _ => return Err(RbacError::Auth("Account is no longer active".to_string())),
        };

        let access = Claims::new(user.id, user.username, TokenType::Access);
        Ok(create_token(&access, &self.secret)?)
    }

    /// Profile, role codes and menu tree of an authenticated user
    pub async fn current_user(&self, user_id: i64) -> RbacResult<CurrentUser> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| RbacError::not_found("User", user_id))?;

        Ok(CurrentUser {
            roles: self.resolver.resolve_role_codes(user_id).await?,
            menus: self.resolver.resolve_tree(user_id).await?,
            user,
        })
    }

    /// Navigation tree of an authenticated user
    pub async fn current_menus(&self, user_id: i64) -> RbacResult<Vec<MenuTreeNode>> {
        self.resolver.resolve_tree(user_id).await
    }
}
