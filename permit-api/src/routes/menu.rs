/// Menu administration and navigation trees
///
/// # Endpoints
///
/// - `GET  /menu/searchAllMenu/` - Every menu, flat, in display order
/// - `GET  /menu/search` - Every menu as a tree
/// - `GET  /menu/nav` - The caller's permitted menus as a tree
/// - `POST /menu/save` - Create (no `id`) or update a menu
/// - `POST /menu/delete` - Delete a childless, ungranted menu
///
/// Tree nodes carry the menu's own fields plus `children`, which is `[]`
/// for leaves.

use crate::{app::AppState, error::ApiResult, routes::DeleteRequest};
use axum::{extract::State, http::StatusCode, Extension, Json};
use permit_shared::{
    auth::gate::AuthContext,
    models::menu::{Menu, MenuInput, MenuType},
    rbac::MenuTreeNode,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SaveMenuRequest {
    pub id: Option<i64>,

    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Icon must be at most 100 characters"))]
    pub icon: Option<String>,

    /// Absent or 0 for a top-level menu
    pub parent_id: Option<i64>,

    pub order_num: Option<i32>,

    #[validate(length(max = 200, message = "Path must be at most 200 characters"))]
    pub path: Option<String>,

    #[validate(length(max = 255, message = "Component must be at most 255 characters"))]
    pub component: Option<String>,

    pub menu_type: Option<MenuType>,

    #[validate(length(max = 100, message = "Perms must be at most 100 characters"))]
    pub perms: Option<String>,

    #[validate(length(max = 500, message = "Remark must be at most 500 characters"))]
    pub remark: Option<String>,
}

impl From<SaveMenuRequest> for MenuInput {
    fn from(req: SaveMenuRequest) -> Self {
        MenuInput {
            name: req.name,
            icon: req.icon,
            parent_id: req.parent_id,
            order_num: req.order_num,
            path: req.path,
            component: req.component,
            menu_type: req.menu_type,
            perms: req.perms,
            remark: req.remark,
        }
    }
}

pub async fn search_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Menu>>> {
    Ok(Json(state.menus.list_all().await?))
}

/// Full menu tree, for the menu administration screen
pub async fn search(State(state): State<AppState>) -> ApiResult<Json<Vec<MenuTreeNode>>> {
    Ok(Json(state.menus.tree().await?))
}

/// The caller's navigation tree
pub async fn nav(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<MenuTreeNode>>> {
    Ok(Json(state.auth.current_menus(auth.user_id).await?))
}

pub async fn save(
    State(state): State<AppState>,
    Json(req): Json<SaveMenuRequest>,
) -> ApiResult<Json<Menu>> {
    req.validate()?;

    let id = req.id;
    Ok(Json(state.menus.save(id, req.into()).await?))
}

/// Deletes a menu
///
/// # Errors
///
/// - `404 Not Found`: no such menu
/// - `409 Conflict`: the menu has children or is granted to a role
pub async fn delete(
    State(state): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;
    state.menus.delete(req.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
