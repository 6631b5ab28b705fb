/// Admin services
///
/// Business rules for users, roles and menus on top of an
/// [`EntityStore`](crate::store::EntityStore). Every operation validates its
/// input and checks uniqueness and integrity guards before the first write,
/// so a rejected call never leaves a partial change behind.
///
/// - [`auth::AuthService`]: login, token refresh, current-user views
/// - [`user::UserService`]: user CRUD and role assignment
/// - [`role::RoleService`]: role CRUD and menu permission assignment
/// - [`menu::MenuService`]: menu CRUD and the full menu tree
/// - [`bootstrap`]: first-run superuser provisioning

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, RbacResult};

pub mod auth;
pub mod bootstrap;
pub mod menu;
pub mod role;
pub mod user;

pub use auth::AuthService;
pub use menu::MenuService;
pub use role::RoleService;
pub use user::UserService;

/// Outcome of replacing a link set
///
/// Unknown target IDs do not fail the operation; they are reported here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReport {
    /// IDs now linked, ascending
    pub assigned: Vec<i64>,

    /// Requested IDs that do not exist, ascending
    pub skipped: Vec<i64>,
}

impl AssignmentReport {
    /// Splits `requested` into known and unknown IDs
    pub(crate) fn partition(requested: &[i64], existing: &[i64]) -> Self {
        let existing: BTreeSet<i64> = existing.iter().copied().collect();
        let requested: BTreeSet<i64> = requested.iter().copied().collect();

        Self {
            assigned: requested.intersection(&existing).copied().collect(),
            skipped: requested.difference(&existing).copied().collect(),
        }
    }
}

/// Trims a required text field, rejecting blank or oversized values
pub(crate) fn required(field: &'static str, value: &str, max_len: usize) -> RbacResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(RbacError::validation(field, "must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(RbacError::validation(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }

    Ok(value.to_string())
}

/// Trims an optional text field; blank becomes None
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
