/// Role administration
///
/// # Endpoints
///
/// - `GET  /role/searchAllRole/` - Every role
/// - `POST /role/search` - Paginated role search
/// - `POST /role/save` - Create (no `id`) or update a role
/// - `POST /role/delete` - Delete a role (the superuser role is refused)
/// - `GET  /role/getRoleMenus?roleId=` - Menu IDs granted to a role
/// - `POST /role/assignPermission` - Replace a role's menu set

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{DeleteRequest, SearchRequest},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use permit_shared::{
    models::role::{Role, RoleInput},
    services::AssignmentReport,
    store::Page,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SaveRoleRequest {
    pub id: Option<i64>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 100, message = "Code must be 1 to 100 characters"))]
    pub code: String,

    #[validate(length(max = 500, message = "Remark must be at most 500 characters"))]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleIdQuery {
    #[serde(rename = "roleId")]
    pub role_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AssignPermissionRequest {
    pub role_id: i64,

    /// Complete new menu set; unknown IDs are skipped
    #[serde(default)]
    pub menu_ids: Vec<i64>,
}

pub async fn search_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(state.roles.list_all().await?))
}

pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<Page<Role>>> {
    req.validate()?;
    Ok(Json(state.roles.search(&req.query, req.page()).await?))
}

pub async fn save(
    State(state): State<AppState>,
    Json(req): Json<SaveRoleRequest>,
) -> ApiResult<Json<Role>> {
    req.validate()?;

    let role = state
        .roles
        .save(
            req.id,
            RoleInput {
                name: req.name,
                code: req.code,
                remark: req.remark,
            },
        )
        .await?;

    Ok(Json(role))
}

/// Deletes a role and its links
///
/// # Errors
///
/// - `404 Not Found`: no such role
/// - `409 Conflict`: the superuser role
pub async fn delete(
    State(state): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;
    state.roles.delete(req.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_role_menus(
    State(state): State<AppState>,
    Query(query): Query<RoleIdQuery>,
) -> ApiResult<Json<Vec<i64>>> {
    Ok(Json(state.roles.menu_ids(query.role_id).await?))
}

pub async fn assign_permission(
    State(state): State<AppState>,
    Json(req): Json<AssignPermissionRequest>,
) -> ApiResult<Json<AssignmentReport>> {
    Ok(Json(
        state
            .roles
            .assign_permissions(req.role_id, &req.menu_ids)
            .await?,
    ))
}
