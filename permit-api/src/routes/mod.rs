/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `user`: Login, token refresh, current user and user administration
/// - `role`: Role administration and menu permissions
/// - `menu`: Menu administration and navigation trees

use permit_shared::store::PageRequest;
use serde::Deserialize;
use validator::Validate;

pub mod health;
pub mod menu;
pub mod role;
pub mod user;

/// Paginated substring search body shared by users and roles
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchRequest {
    /// Case-insensitive substring; blank matches everything
    #[serde(default)]
    #[validate(length(max = 100, message = "Query must be at most 100 characters"))]
    pub query: String,

    #[serde(default)]
    pub page_num: Option<u32>,

    #[serde(default)]
    pub page_size: Option<u32>,
}

impl SearchRequest {
    pub fn page(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest::new(
            self.page_num.unwrap_or(default.page_num),
            self.page_size.unwrap_or(default.page_size),
        )
    }
}

/// Body of the delete endpoints
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteRequest {
    #[validate(range(min = 1, message = "ID must be positive"))]
    pub id: i64,
}
